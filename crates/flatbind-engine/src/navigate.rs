//! Group traversal: which record may come next
//!
//! The navigator keeps one [`GroupContext`] per active group, from the
//! stream's implicit root down to the group holding the last record.
//! Components are addressed by their child index path from the root.
//!
//! Candidates are scanned from the innermost context outwards and, within
//! a group, in declaration order. The first candidate that matches and is
//! allowed at the current point wins. A candidate that matches but is not
//! allowed (its maximum is exhausted, it is out of order, or it would skip
//! an unsatisfied sibling) is remembered and scanning continues; the first
//! such rejection is reported only when nothing else is acceptable.

use flatbind_schema::{Component, GroupDefinition, RecordDefinition, StreamDefinition};
use tracing::trace;

/// Occurrence state of one active group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupContext {
    path: Vec<usize>,
    counts: Vec<usize>,
    position: usize,
}

impl GroupContext {
    fn new(path: Vec<usize>, group: &GroupDefinition) -> Self {
        Self {
            path,
            counts: vec![0; group.children.len()],
            position: 0,
        }
    }

    /// Child index path of the group
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Occurrences of each child in the current group occurrence
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    fn unsatisfied<'g>(&self, group: &'g GroupDefinition) -> Option<&'g Component> {
        group
            .children
            .iter()
            .zip(&self.counts)
            .find(|(child, count)| **count < child.min_occurs())
            .map(|(child, _)| child)
    }
}

/// Why no record could be accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No record matched at all
    Unidentified,
    /// `record` matched but is not allowed here
    Unexpected { record: String, message: String },
}

/// A component that must still occur before the stream may end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missing {
    pub kind: &'static str,
    pub name: String,
}

/// An accepted match, not yet applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    depth: usize,
    index: usize,
    descent: Vec<usize>,
    path: Vec<usize>,
}

impl Candidate {
    /// Child index path of the matched record
    pub fn path(&self) -> &[usize] {
        &self.path
    }
}

/// A match inside a group that has not been entered yet
struct Found {
    descent: Vec<usize>,
    blocked: Option<String>,
}

/// Group traversal state of one reader or writer
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<GroupContext>,
}

impl Navigator {
    pub fn new(stream: &StreamDefinition) -> Self {
        Self {
            stack: vec![GroupContext::new(Vec::new(), stream.root())],
        }
    }

    /// Active group contexts, outermost first
    pub fn contexts(&self) -> &[GroupContext] {
        &self.stack
    }

    /// Find the record to accept next without changing any state
    pub fn locate<F>(&self, stream: &StreamDefinition, mut matches: F) -> Result<Candidate, Rejection>
    where
        F: FnMut(&[usize], &RecordDefinition) -> bool,
    {
        let mut rejection = None;
        for depth in (0..self.stack.len()).rev() {
            let frame = &self.stack[depth];
            let Some(group) = stream.group_at(&frame.path) else {
                continue;
            };
            for (index, child) in group.children.iter().enumerate() {
                let mut path = frame.path.clone();
                path.push(index);
                let found = match child {
                    Component::Record(record) => matches(&path, record).then(|| Found {
                        descent: Vec::new(),
                        blocked: None,
                    }),
                    Component::Group(nested) => enter(nested, &path, &mut matches),
                };
                let Some(found) = found else {
                    continue;
                };

                let mut record_path = path.clone();
                record_path.extend_from_slice(&found.descent);
                let blocked = found
                    .blocked
                    .or_else(|| self.check(stream, depth, group, index, child));
                match blocked {
                    None => {
                        return Ok(Candidate {
                            depth,
                            index,
                            descent: found.descent,
                            path: record_path,
                        });
                    }
                    Some(message) => {
                        if rejection.is_none() {
                            let record = stream
                                .record_at(&record_path)
                                .map(|r| r.name.clone())
                                .unwrap_or_default();
                            trace!(%record, %message, "Rejected candidate record");
                            rejection = Some(Rejection::Unexpected { record, message });
                        }
                    }
                }
            }
        }
        Err(rejection.unwrap_or(Rejection::Unidentified))
    }

    /// Apply an accepted candidate: count it and enter any groups above it
    pub fn commit(&mut self, stream: &StreamDefinition, candidate: Candidate) -> Vec<usize> {
        self.stack.truncate(candidate.depth + 1);
        let Some(frame) = self.stack.get_mut(candidate.depth) else {
            return candidate.path;
        };
        frame.counts[candidate.index] += 1;
        frame.position = candidate.index;

        let mut path = frame.path.clone();
        path.push(candidate.index);
        for &index in &candidate.descent {
            let Some(group) = stream.group_at(&path) else {
                break;
            };
            let mut context = GroupContext::new(path.clone(), group);
            context.counts[index] = 1;
            context.position = index;
            self.stack.push(context);
            path.push(index);
        }
        candidate.path
    }

    /// Locate and commit in one step
    pub fn advance<F>(&mut self, stream: &StreamDefinition, matches: F) -> Result<Vec<usize>, Rejection>
    where
        F: FnMut(&[usize], &RecordDefinition) -> bool,
    {
        let candidate = self.locate(stream, matches)?;
        Ok(self.commit(stream, candidate))
    }

    /// First component whose minimum occurrences are not yet met
    pub fn finish(&self, stream: &StreamDefinition) -> Option<Missing> {
        self.stack.iter().rev().find_map(|frame| {
            let group = stream.group_at(&frame.path)?;
            frame.unsatisfied(group).map(|child| Missing {
                kind: child.kind(),
                name: child.name().to_string(),
            })
        })
    }

    /// Whether accepting child `index` of the group at `depth` is allowed
    fn check(
        &self,
        stream: &StreamDefinition,
        depth: usize,
        group: &GroupDefinition,
        index: usize,
        child: &Component,
    ) -> Option<String> {
        for deeper in self.stack[depth + 1..].iter().rev() {
            let Some(nested) = stream.group_at(&deeper.path) else {
                continue;
            };
            if let Some(missing) = deeper.unsatisfied(nested) {
                return Some(expected(missing));
            }
        }
        let frame = &self.stack[depth];
        if child.max_occurs().is_some_and(|max| frame.counts[index] >= max) {
            return Some(format!(
                "Maximum occurrences of {} '{}' exceeded",
                child.kind(),
                child.name()
            ));
        }
        if group.ordered {
            if index < frame.position {
                return Some(format!("{} '{}' is out of order", capitalize(child.kind()), child.name()));
            }
            let skipped = (frame.position..index).find(|&j| frame.counts[j] < group.children[j].min_occurs());
            if let Some(j) = skipped {
                return Some(expected(&group.children[j]));
            }
        }
        None
    }
}

/// First match inside a group that has no active context yet
fn enter<F>(group: &GroupDefinition, path: &[usize], matches: &mut F) -> Option<Found>
where
    F: FnMut(&[usize], &RecordDefinition) -> bool,
{
    let mut rejected = None;
    for (index, child) in group.children.iter().enumerate() {
        let mut child_path = path.to_vec();
        child_path.push(index);
        let found = match child {
            Component::Record(record) => matches(&child_path, record).then(|| Found {
                descent: Vec::new(),
                blocked: None,
            }),
            Component::Group(nested) => enter(nested, &child_path, matches),
        };
        let Some(mut found) = found else {
            continue;
        };
        found.descent.insert(0, index);
        if found.blocked.is_none() && group.ordered {
            found.blocked = group.children[..index]
                .iter()
                .find(|sibling| sibling.min_occurs() > 0)
                .map(expected);
        }
        if found.blocked.is_none() {
            return Some(found);
        }
        rejected.get_or_insert(found);
    }
    rejected
}

fn expected(component: &Component) -> String {
    format!("Expected {} '{}'", component.kind(), component.name())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
