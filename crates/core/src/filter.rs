//! Narrowing a report down to the exercise the learner is working on.
//!
//! Exercise files hold tests for many exercises; tests are tagged with
//! `"Exercise <N>: ..."` in their display name, so the runner never needs to
//! know which exercise is selected.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ExerciseId, NormalizedSuite};

static EXERCISE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Exercise (\d+):").expect("exercise tag pattern is valid"));

/// Static table from exercise-id prefix to the test file of that section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteMap {
    entries: Vec<(String, String)>,
}

impl SuiteMap {
    /// Entries are `(prefix, suite file)`, e.g. `("lists-", "03-Session1-Lists.test.tsx")`.
    /// The first matching prefix wins.
    #[must_use]
    pub fn new<P, F>(entries: impl IntoIterator<Item = (P, F)>) -> Self
    where
        P: Into<String>,
        F: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(prefix, file)| (prefix.into(), file.into()))
                .collect(),
        }
    }

    /// Suite file expected for `id`, if its prefix is known.
    #[must_use]
    pub fn suite_file_for(&self, id: &ExerciseId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(prefix, _)| id.as_str().starts_with(prefix.as_str()))
            .map(|(_, file)| file.as_str())
    }

    /// Resolve the filter key for `id`; `None` when the prefix is unmapped.
    #[must_use]
    pub fn filter_key(&self, id: &ExerciseId) -> Option<ExerciseFilterKey> {
        let suite_file = self.suite_file_for(id)?;
        Some(ExerciseFilterKey {
            suite_file: suite_file.to_string(),
            exercise_number: id.number().map(str::to_owned),
        })
    }
}

impl Default for SuiteMap {
    /// The two-session training course layout.
    fn default() -> Self {
        Self::new([
            ("jsx-", "01-Session1-JSX.test.tsx"),
            ("props-", "02-Session1-Props.test.tsx"),
            ("lists-", "03-Session1-Lists.test.tsx"),
            ("events-", "04-Session1-Events.test.tsx"),
            ("state-", "05-Session2-State.test.tsx"),
            ("effects-", "06-Session2-Effects.test.tsx"),
            ("refs-", "07-Session2-Refs.test.tsx"),
        ])
    }
}

/// Which suite file and which exercise tag to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseFilterKey {
    pub suite_file: String,
    pub exercise_number: Option<String>,
}

/// Number from an `"Exercise <N>:"` tag in a test name.
#[must_use]
pub fn exercise_tag(test_name: &str) -> Option<&str> {
    EXERCISE_TAG
        .captures(test_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Keep only the suites and tests relevant to `exercise_id`.
///
/// No selection or an unmapped prefix shows everything. Tag numbers are
/// compared as text, so `"10"` never matches `"1"`. Suites left without
/// tests are dropped.
#[must_use]
pub fn filter_for_exercise(
    suites: &[NormalizedSuite],
    exercise_id: Option<&ExerciseId>,
    map: &SuiteMap,
) -> Vec<NormalizedSuite> {
    let Some(id) = exercise_id else {
        return suites.to_vec();
    };
    let Some(key) = map.filter_key(id) else {
        return suites.to_vec();
    };

    let in_file = suites
        .iter()
        .filter(|suite| suite.file.contains(key.suite_file.as_str()));

    let Some(number) = key.exercise_number.as_deref() else {
        return in_file.cloned().collect();
    };

    in_file
        .map(|suite| {
            let tests = suite
                .tests
                .iter()
                .filter(|test| exercise_tag(&test.name) == Some(number))
                .cloned()
                .collect();
            suite.with_tests(tests)
        })
        .filter(|suite| !suite.tests.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NormalizedTest, TestStatus};

    fn test(name: &str, status: TestStatus) -> NormalizedTest {
        NormalizedTest {
            name: name.to_string(),
            status,
            duration_ms: 1.0,
            error: None,
        }
    }

    fn map() -> SuiteMap {
        SuiteMap::new([("a-", "A.test"), ("b-", "B.test")])
    }

    fn suites() -> Vec<NormalizedSuite> {
        vec![
            NormalizedSuite::new(
                "/src/A.test",
                vec![
                    test("Suite Exercise 1: does one thing", TestStatus::Pass),
                    test("Suite Exercise 10: does another", TestStatus::Fail),
                    test("Suite Exercise 2: skipped", TestStatus::Skip),
                ],
            ),
            NormalizedSuite::new(
                "/src/B.test",
                vec![test("Other Exercise 1: b side", TestStatus::Pass)],
            ),
        ]
    }

    #[test]
    fn no_selection_returns_everything() {
        assert_eq!(filter_for_exercise(&suites(), None, &map()), suites());
    }

    #[test]
    fn unmapped_prefix_returns_everything() {
        let id = ExerciseId::new("zzz-1");
        assert_eq!(filter_for_exercise(&suites(), Some(&id), &map()), suites());
    }

    #[test]
    fn exercise_number_matches_exactly() {
        let id = ExerciseId::new("a-1");
        let filtered = filter_for_exercise(&suites(), Some(&id), &map());

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].file, "/src/A.test");
        let names: Vec<&str> = filtered[0].tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Suite Exercise 1: does one thing"]);
        assert_eq!(
            (
                filtered[0].pass_count,
                filtered[0].fail_count,
                filtered[0].skip_count
            ),
            (1, 0, 0)
        );
    }

    #[test]
    fn multi_digit_number_does_not_match_prefix_of_itself() {
        let id = ExerciseId::new("a-10");
        let filtered = filter_for_exercise(&suites(), Some(&id), &map());
        assert_eq!(filtered[0].tests.len(), 1);
        assert_eq!(filtered[0].tests[0].name, "Suite Exercise 10: does another");
        assert_eq!(filtered[0].fail_count, 1);
        assert_eq!(filtered[0].pass_count, 0);
    }

    #[test]
    fn suites_without_matching_tests_are_dropped() {
        let id = ExerciseId::new("a-7");
        assert!(filter_for_exercise(&suites(), Some(&id), &map()).is_empty());
    }

    #[test]
    fn id_without_number_keeps_whole_file() {
        let id = ExerciseId::new("b-extra");
        let filtered = filter_for_exercise(&suites(), Some(&id), &map());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].file, "/src/B.test");
        assert_eq!(filtered[0].tests.len(), 1);
    }

    #[test]
    fn default_map_covers_course_sections() {
        let map = SuiteMap::default();
        let key = map.filter_key(&ExerciseId::new("effects-10")).unwrap();
        assert_eq!(key.suite_file, "06-Session2-Effects.test.tsx");
        assert_eq!(key.exercise_number.as_deref(), Some("10"));
        assert!(map.filter_key(&ExerciseId::new("hooks-1")).is_none());
    }

    #[test]
    fn tag_is_read_from_anywhere_in_the_name() {
        assert_eq!(exercise_tag("Refs > Exercise 4: measures"), Some("4"));
        assert_eq!(exercise_tag("Exercise four: measures"), None);
        assert_eq!(exercise_tag("Exercise 4 measures"), None);
    }
}
