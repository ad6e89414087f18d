use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::workflows::admittance::{Opening, Person, Placement, Registration, Timeslot};

pub(super) const PEOPLE: [(&str, &str); 12] = [
    ("Kate Mccoy", "katemccoy@gmail.com"),
    ("Barrett Ingram", "barrettingram@gmail.com"),
    ("Zayden Jenkins", "zaydenjenkins@gmail.com"),
    ("Ruben Palmer", "rubenpalmer@gmail.com"),
    ("Jaydon Huff", "jaydonhuff@gmail.com"),
    ("Yamilet Walton", "yamiletwalton@gmail.com"),
    ("Khalil Richards", "khalilrichards@gmail.com"),
    ("Serenity Castaneda", "serenitycastaneda@gmail.com"),
    ("River Fry", "riverfry@gmail.com"),
    ("Tristen Lamb", "tristenlamb@gmail.com"),
    ("Walter Carr", "waltercarr@gmail.com"),
    ("Braydon Short", "braydonshort@gmail.com"),
];

pub(super) fn at(minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 8, 18)
        .and_then(|date| date.and_hms_opt(18, minute, second))
        .expect("valid timestamp")
}

pub(super) fn person(index: usize) -> Person {
    let (name, email) = PEOPLE[index];
    Person::new(name, email)
}

pub(super) fn waiter() -> Person {
    Person::new("Jordon Emelie", "jordonemelie@gmail.com")
}

pub(super) fn register(person: Person, time: NaiveDateTime, slots: &str) -> Registration {
    Registration::new(person, time, slots.split(','))
}

/// The twelve fixture people, one second apart from 18:04:40.
pub(super) fn registrations(slots: &str) -> Vec<Registration> {
    (0..PEOPLE.len())
        .map(|index| register(person(index), at(4, 40 + index as u32), slots))
        .collect()
}

/// Slot `a` holds five people and slot `b` ten.
pub(super) fn opening() -> Opening {
    Opening::new([("a", Timeslot::limited(5)), ("b", Timeslot::limited(10))])
        .expect("distinct timeslot names")
}

pub(super) fn roster(opening: &Opening, slot: &str) -> Vec<Person> {
    opening
        .timeslot(slot)
        .map(|timeslot| timeslot.spots().to_vec())
        .unwrap_or_default()
}

pub(super) fn waiting(opening: &Opening) -> Vec<Person> {
    opening
        .waiting_list()
        .iter()
        .map(|registration| registration.person.clone())
        .collect()
}

/// Placement, roster and waiting-list state must agree with each other.
pub(super) fn assert_consistent(opening: &Opening) {
    let mut seen = HashSet::new();

    for (name, slot) in opening.timeslots() {
        if let Some(capacity) = slot.capacity() {
            assert!(slot.spots_taken() <= capacity, "{name} is over capacity");
        }
        for person in slot.spots() {
            assert!(seen.insert(person.clone()), "{person} holds two spots");
            assert!(!opening.banned().contains(person), "{person} is banned but admitted");
            assert!(!slot.is_disallowed(person), "{person} is disallowed from {name}");
            assert_eq!(
                opening.placement(person),
                Placement::Admitted {
                    timeslot: name.clone()
                }
            );
        }
    }

    for person in waiting(opening) {
        assert!(seen.insert(person.clone()), "{person} is admitted and waiting");
        assert_eq!(opening.placement(&person), Placement::Waiting);
    }

    for person in opening.cancelled() {
        assert!(!seen.contains(person), "{person} is cancelled but still placed");
    }
}
