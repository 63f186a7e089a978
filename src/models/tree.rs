use std::path::PathBuf;
use std::time::Duration;

use super::result::{Location, TestResult};
use super::status::{Outcome, TestStatus};

pub type TestId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Project,
    File,
    Describe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Suite(usize),
    Test(TestId),
}

#[derive(Debug, Clone)]
pub struct SuiteNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<Child>,
    pub kind: NodeKind,
    pub title: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub id: TestId,
    pub project: Option<String>,
    /// Enclosing describe titles followed by the test's own title.
    pub titles: Vec<String>,
    pub location: Location,
    pub expected_status: TestStatus,
    pub timeout: Duration,
    /// How many retries the execution engine may schedule after the first attempt.
    pub retries: usize,
    pub results: Vec<TestResult>,
}

impl TestCase {
    pub fn new(title: impl Into<String>, location: Location) -> Self {
        Self {
            id: 0,
            project: None,
            titles: vec![title.into()],
            location,
            expected_status: TestStatus::Passed,
            timeout: Duration::from_secs(30),
            retries: 0,
            results: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        self.titles.last().map(String::as_str).unwrap_or_default()
    }

    pub fn outcome(&self) -> Outcome {
        let mut non_skipped = self
            .results
            .iter()
            .filter(|r| r.status != TestStatus::Skipped)
            .peekable();
        if non_skipped.peek().is_none() {
            return Outcome::Skipped;
        }
        let (mut expected, mut total) = (0, 0);
        for result in non_skipped {
            total += 1;
            if result.status == self.expected_status {
                expected += 1;
            }
        }
        if expected == total {
            Outcome::Expected
        } else if expected > 0 {
            Outcome::Flaky
        } else {
            Outcome::Unexpected
        }
    }
}

/// Projects, files and describe blocks, with tests as leaves.
#[derive(Debug, Default)]
pub struct TestTree {
    nodes: Vec<SuiteNode>,
    root_ids: Vec<usize>,
    tests: Vec<TestCase>,
}

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root-level node (project, or file when there are no projects). Returns the node id.
    pub fn add_root(&mut self, kind: NodeKind, title: String, path: Option<PathBuf>) -> usize {
        let id = self.add_node(kind, title, path, None);
        self.root_ids.push(id);
        id
    }

    /// Add a child node under a parent. Returns the node id.
    pub fn add_child(
        &mut self,
        parent_id: usize,
        kind: NodeKind,
        title: String,
        path: Option<PathBuf>,
    ) -> usize {
        let id = self.add_node(kind, title, path, Some(parent_id));
        self.nodes[parent_id].children.push(Child::Suite(id));
        id
    }

    fn add_node(
        &mut self,
        kind: NodeKind,
        title: String,
        path: Option<PathBuf>,
        parent: Option<usize>,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(SuiteNode {
            id,
            parent,
            children: Vec::new(),
            kind,
            title,
            path,
        });
        id
    }

    /// Attach a test under `parent_id`, filling in its id, project and the
    /// titles of enclosing describe blocks.
    pub fn add_test(&mut self, parent_id: usize, mut test: TestCase) -> TestId {
        let id = self.tests.len();
        let mut describes = Vec::new();
        let mut current = Some(parent_id);
        while let Some(node) = current.and_then(|nid| self.nodes.get(nid)) {
            match node.kind {
                NodeKind::Describe => describes.push(node.title.clone()),
                NodeKind::Project => test.project = Some(node.title.clone()),
                NodeKind::File => {}
            }
            current = node.parent;
        }
        describes.reverse();
        describes.append(&mut test.titles);
        test.titles = describes;
        test.id = id;

        self.nodes[parent_id].children.push(Child::Test(id));
        self.tests.push(test);
        id
    }

    pub fn get(&self, id: usize) -> Option<&SuiteNode> {
        self.nodes.get(id)
    }

    pub fn test(&self, id: TestId) -> Option<&TestCase> {
        self.tests.get(id)
    }

    pub fn test_mut(&mut self, id: TestId) -> Option<&mut TestCase> {
        self.tests.get_mut(id)
    }

    pub fn roots(&self) -> &[usize] {
        &self.root_ids
    }

    /// Find a child suite of `parent` with the given title, or None.
    pub fn find_child_by_title(&self, parent: usize, title: &str) -> Option<usize> {
        self.nodes.get(parent)?.children.iter().find_map(|child| match child {
            Child::Suite(id) if self.nodes.get(*id).is_some_and(|n| n.title == title) => Some(*id),
            _ => None,
        })
    }

    /// Find a test directly under `parent` with the given title, or None.
    pub fn find_test_by_title(&self, parent: usize, title: &str) -> Option<TestId> {
        self.nodes.get(parent)?.children.iter().find_map(|child| match child {
            Child::Test(id) if self.tests.get(*id).is_some_and(|t| t.title() == title) => {
                Some(*id)
            }
            _ => None,
        })
    }

    /// Find a root node with the given title, or None.
    pub fn find_root_by_title(&self, title: &str) -> Option<usize> {
        self.root_ids
            .iter()
            .copied()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.title == title))
    }

    /// Every test in the tree, depth first in insertion order.
    pub fn all_tests(&self) -> Vec<&TestCase> {
        let mut result = Vec::with_capacity(self.tests.len());
        for &root_id in &self.root_ids {
            self.collect_tests(root_id, &mut result);
        }
        result
    }

    fn collect_tests<'a>(&'a self, id: usize, result: &mut Vec<&'a TestCase>) {
        for child in &self.nodes[id].children {
            match *child {
                Child::Suite(sid) => self.collect_tests(sid, result),
                Child::Test(tid) => result.push(&self.tests[tid]),
            }
        }
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}
