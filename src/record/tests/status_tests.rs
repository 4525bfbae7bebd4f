//! Tests for the record status transition table and status parsing.

use crate::record::domain::RecordStatus;
use rstest::rstest;

#[rstest]
#[case(RecordStatus::ToDo, RecordStatus::InProgress, true)]
#[case(RecordStatus::ToDo, RecordStatus::Archived, true)]
#[case(RecordStatus::ToDo, RecordStatus::Review, false)]
#[case(RecordStatus::ToDo, RecordStatus::Done, false)]
#[case(RecordStatus::ToDo, RecordStatus::Blocked, false)]
#[case(RecordStatus::InProgress, RecordStatus::Review, true)]
#[case(RecordStatus::InProgress, RecordStatus::Blocked, true)]
#[case(RecordStatus::InProgress, RecordStatus::Archived, true)]
#[case(RecordStatus::InProgress, RecordStatus::Done, false)]
#[case(RecordStatus::InProgress, RecordStatus::ToDo, false)]
#[case(RecordStatus::Blocked, RecordStatus::InProgress, true)]
#[case(RecordStatus::Blocked, RecordStatus::Archived, true)]
#[case(RecordStatus::Blocked, RecordStatus::Review, false)]
#[case(RecordStatus::Review, RecordStatus::Done, true)]
#[case(RecordStatus::Review, RecordStatus::Archived, true)]
#[case(RecordStatus::Review, RecordStatus::InProgress, false)]
#[case(RecordStatus::Done, RecordStatus::Archived, false)]
#[case(RecordStatus::Done, RecordStatus::ToDo, false)]
#[case(RecordStatus::Archived, RecordStatus::ToDo, false)]
#[case(RecordStatus::Archived, RecordStatus::InProgress, false)]
fn transition_table(
    #[case] from: RecordStatus,
    #[case] to: RecordStatus,
    #[case] allowed: bool,
) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
fn no_status_transitions_to_itself() {
    for status in RecordStatus::ALL {
        assert!(!status.can_transition_to(status), "{status} -> {status}");
    }
}

#[rstest]
fn only_archived_to_todo_is_an_unarchive() {
    assert!(RecordStatus::Archived.is_unarchive(RecordStatus::ToDo));
    assert!(!RecordStatus::Done.is_unarchive(RecordStatus::ToDo));
    assert!(!RecordStatus::Archived.is_unarchive(RecordStatus::InProgress));
}

#[rstest]
fn done_has_no_successors() {
    assert!(RecordStatus::Done.successors().is_empty());
    assert_eq!(
        RecordStatus::Review.successors(),
        vec![RecordStatus::Done, RecordStatus::Archived]
    );
}

#[rstest]
#[case("todo", RecordStatus::ToDo)]
#[case("To Do", RecordStatus::ToDo)]
#[case("🟡 To Do", RecordStatus::ToDo)]
#[case("in_progress", RecordStatus::InProgress)]
#[case("🔵 In Progress", RecordStatus::InProgress)]
#[case("In Review", RecordStatus::Review)]
#[case("🟢 Done", RecordStatus::Done)]
#[case("blocked", RecordStatus::Blocked)]
#[case("⚪ Archived", RecordStatus::Archived)]
fn status_parses_canonical_and_labelled_forms(
    #[case] input: &str,
    #[case] expected: RecordStatus,
) {
    assert_eq!(RecordStatus::try_from(input), Ok(expected));
}

#[rstest]
fn every_label_parses_back() {
    for status in RecordStatus::ALL {
        assert_eq!(RecordStatus::try_from(status.label()), Ok(status));
        assert_eq!(RecordStatus::try_from(status.as_str()), Ok(status));
    }
}

#[rstest]
fn unknown_status_is_rejected() {
    assert!(RecordStatus::try_from("🟠 Pending").is_err());
}
