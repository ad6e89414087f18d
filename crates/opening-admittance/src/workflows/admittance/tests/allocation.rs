use super::common::*;
use crate::workflows::admittance::{Opening, Placement, Remark, Timeslot};

#[test]
fn twelve_people_fill_first_choice_then_second() {
    let mut opening = opening();
    let summary = opening.auto_admit(registrations("a,b"));

    assert_eq!(summary.canonical, 12);
    assert_eq!(summary.admitted, 12);
    assert_eq!(summary.waiting, 0);

    let expected_a: Vec<_> = (0..5).map(person).collect();
    let expected_b: Vec<_> = (5..12).map(person).collect();
    assert_eq!(roster(&opening, "a"), expected_a);
    assert_eq!(roster(&opening, "b"), expected_b);
    assert!(opening.waiting_list().is_empty());
    assert!(opening.remarks().is_empty());
    assert_consistent(&opening);
}

#[test]
fn thirteenth_person_with_only_a_full_slot_waits() {
    let mut opening = opening();
    let mut batch = registrations("a,b");
    batch.push(register(waiter(), at(5, 0), "a"));

    let summary = opening.auto_admit(batch);

    assert_eq!(summary.waiting, 1);
    assert_eq!(waiting(&opening), vec![waiter()]);
    assert_eq!(opening.placement(&waiter()), Placement::Waiting);
    assert!(!roster(&opening, "a").contains(&waiter()));
    assert!(!roster(&opening, "b").contains(&waiter()));
    assert_consistent(&opening);
}

#[test]
fn requested_order_decides_the_slot() {
    let mut opening = opening();
    opening.auto_admit([register(person(0), at(4, 40), "b,a")]);

    assert_eq!(
        opening.placement(&person(0)),
        Placement::Admitted {
            timeslot: "b".to_string()
        }
    );
}

#[test]
fn unknown_timeslots_are_ignored() {
    let mut opening = opening();
    opening.auto_admit([
        register(person(0), at(4, 40), "c, b"),
        register(person(1), at(4, 41), "c"),
    ]);

    assert_eq!(roster(&opening, "b"), vec![person(0)]);
    assert_eq!(waiting(&opening), vec![person(1)]);
    assert_consistent(&opening);
}

#[test]
fn unbounded_slot_admits_everyone() {
    let mut opening =
        Opening::new([("open", Timeslot::unlimited())]).expect("single timeslot");
    opening.auto_admit(registrations("open"));

    let slot = opening.timeslot("open").expect("configured slot");
    assert_eq!(slot.spots_taken(), 12);
    assert_eq!(slot.spots_available(), None);
}

#[test]
fn zero_capacity_slot_sends_everyone_onwards() {
    let mut opening = Opening::new([("a", Timeslot::limited(0)), ("b", Timeslot::limited(20))])
        .expect("distinct timeslot names");
    opening.auto_admit(registrations("a,b"));

    assert!(roster(&opening, "a").is_empty());
    assert_eq!(roster(&opening, "b").len(), 12);
}

#[test]
fn disallowed_person_falls_through_to_next_choice() {
    let mut opening = opening();
    opening.disallow("a", [person(0)]).expect("slot a exists");
    opening.auto_admit(registrations("a,b"));

    assert_eq!(
        opening.placement(&person(0)),
        Placement::Admitted {
            timeslot: "b".to_string()
        }
    );
    assert_eq!(
        opening.remarks().for_person(&person(0)),
        &[Remark::DownPrioritized {
            timeslot: Some("a".to_string())
        }]
    );
    assert_eq!(roster(&opening, "a"), (1..6).map(person).collect::<Vec<_>>());
    assert_consistent(&opening);
}

#[test]
fn person_disallowed_everywhere_is_skipped() {
    let mut opening = opening();
    opening.disallow("a", [person(0)]).expect("slot a exists");
    opening.disallow("b", [person(0)]).expect("slot b exists");

    let summary = opening.auto_admit(registrations("a,b"));

    assert_eq!(summary.skipped, 1);
    assert_eq!(opening.placement(&person(0)), Placement::Unprocessed);
    assert_eq!(
        opening.remarks().for_person(&person(0)),
        &[Remark::DownPrioritized { timeslot: None }]
    );
}

#[test]
fn disallowing_an_unknown_slot_fails() {
    let mut opening = opening();
    let result = opening.disallow("c", [person(0)]);
    assert!(result.is_err());
}

#[test]
fn duplicate_timeslot_names_are_rejected() {
    let result = Opening::new([
        ("10:00 - 11:00", Timeslot::limited(1)),
        ("10:00-11:00", Timeslot::limited(2)),
    ]);
    assert!(result.is_err());
}

#[test]
fn later_batch_keeps_existing_placements() {
    let mut opening = opening();
    opening.auto_admit(registrations("a,b").into_iter().take(3));
    let summary = opening.auto_admit(registrations("a,b"));

    assert_eq!(summary.already_placed, 3);
    assert_eq!(summary.admitted, 9);
    assert_eq!(roster(&opening, "a"), (0..5).map(person).collect::<Vec<_>>());
    assert_eq!(roster(&opening, "b").len(), 7);
    assert_consistent(&opening);
}
