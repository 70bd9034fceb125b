//! Test case descriptors

use std::fmt;

use crate::error::E2eResult;
use crate::runner::SuiteContext;

/// Body of a test case
pub type CaseFn = fn(&SuiteContext<'_>) -> E2eResult<()>;

/// When a case should be skipped instead of run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCondition {
    /// The named settings section was not provided
    SettingMissing(&'static str),
    /// The tracked issue is still open
    IssueOpen(&'static str),
}

impl SkipCondition {
    /// Reason to skip, or `None` if the case should run
    pub fn evaluate(&self, ctx: &SuiteContext<'_>) -> E2eResult<Option<String>> {
        let reason = match *self {
            SkipCondition::SettingMissing(section) => {
                if ctx.settings.setting_is_set(section)? {
                    None
                } else {
                    Some(format!("settings section '{}' is not set", section))
                }
            }
            SkipCondition::IssueOpen(id) => {
                if ctx.issues.is_open(id) {
                    Some(format!("{} is open", id))
                } else {
                    None
                }
            }
        };
        Ok(reason)
    }
}

/// A registered test case
#[derive(Clone, Copy)]
pub struct CaseDescriptor {
    pub id: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    /// Cases that must pass earlier in the same run
    pub dependencies: &'static [&'static str],
    pub skip: Option<SkipCondition>,
    /// Removed from the run entirely, with a reason
    pub deselect: Option<&'static str>,
    pub run: CaseFn,
}

impl CaseDescriptor {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

impl fmt::Debug for CaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseDescriptor")
            .field("id", &self.id)
            .field("tags", &self.tags)
            .field("dependencies", &self.dependencies)
            .field("skip", &self.skip)
            .field("deselect", &self.deselect)
            .finish()
    }
}
