//! Single-threaded contract tests for the skip list, generic over the
//! reclamation guard.

use crate::guard::Guard;
use crate::list::SkipList;

use super::Reading;

fn collect<G: Guard>(list: &SkipList<Reading, G, 16>) -> Vec<f64> {
    list.iter().map(|r| r.0).collect()
}

/// Insert a single element; it is the head, the tail, and findable.
pub fn test_insert_head<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    assert!(list.insert(Reading(8.9988)));

    assert_eq!(collect(&list), vec![8.9988]);
    assert!(list.find(&Reading(8.9988)) != list.end());
}

/// Inserts land in value order regardless of arrival order.
pub fn test_insert_additional<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(8.9988));
    list.insert(Reading(15.6788));
    list.insert(Reading(8000.0));
    list.insert(Reading(1000.4050001));
    list.insert(Reading(5233.05));

    assert_eq!(
        collect(&list),
        vec![8.9988, 15.6788, 1000.4050001, 5233.05, 8000.0]
    );

    assert!(list.find(&Reading(8.9988)) != list.end());
    assert!(list.find(&Reading(1000.4050001)) != list.end());
    assert!(list.find(&Reading(8000.0)) != list.end());
}

/// An equal value is rejected and the list keeps a single copy.
pub fn test_insert_duplicate<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    assert!(list.insert(Reading(8.9988)));
    assert!(list.insert(Reading(15.6788)));
    assert!(!list.insert(Reading(8.9988)));
    assert!(list.insert(Reading(5233.05)));

    assert_eq!(collect(&list), vec![8.9988, 15.6788, 5233.05]);
}

/// Later inserts of smaller values become the new head.
pub fn test_insert_lower<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(8000.0));
    list.insert(Reading(1000.4050001));
    list.insert(Reading(5233.05));
    list.insert(Reading(8.9988));
    list.insert(Reading(15.6788));

    assert_eq!(
        collect(&list),
        vec![8.9988, 15.6788, 1000.4050001, 5233.05, 8000.0]
    );
}

/// A strictly ascending insertion sequence grows at the tail every time.
pub fn test_insert_ascending<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    for i in 0..200 {
        assert!(list.insert(Reading(i as f64 * 0.5)));
    }

    let expected: Vec<f64> = (0..200).map(|i| i as f64 * 0.5).collect();
    assert_eq!(collect(&list), expected);
}

/// A strictly descending insertion sequence grows at the head every time.
pub fn test_insert_descending<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    for i in (0..200).rev() {
        assert!(list.insert(Reading(i as f64 * 0.5)));
    }

    let expected: Vec<f64> = (0..200).map(|i| i as f64 * 0.5).collect();
    assert_eq!(collect(&list), expected);
}

/// Erase through the begin cursor removes the smallest element.
pub fn test_erase_head<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(8000.0));
    list.insert(Reading(1000.4050001));
    list.insert(Reading(5233.05));
    list.insert(Reading(8.9988));
    list.insert(Reading(15.6788));

    assert!(list.erase(&list.begin()));

    assert_eq!(
        collect(&list),
        vec![15.6788, 1000.4050001, 5233.05, 8000.0]
    );
}

/// Erase the largest element.
pub fn test_erase_tail<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(8000.0));
    list.insert(Reading(1000.4050001));
    list.insert(Reading(5233.05));
    list.insert(Reading(8.9988));
    list.insert(Reading(15.6788));

    assert!(list.erase(&list.find(&Reading(8000.0))));

    assert_eq!(
        collect(&list),
        vec![8.9988, 15.6788, 1000.4050001, 5233.05]
    );
}

/// Erase an interior element.
pub fn test_erase_mid<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(8000.0));
    list.insert(Reading(1000.4050001));
    list.insert(Reading(5233.05));
    list.insert(Reading(8.9988));
    list.insert(Reading(15.6788));

    assert!(list.erase(&list.find(&Reading(5233.05))));

    assert_eq!(
        collect(&list),
        vec![8.9988, 15.6788, 1000.4050001, 8000.0]
    );
}

/// Insert, find, erase to empty, iterate the empty list.
pub fn test_single_element_lifecycle<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    assert!(list.is_empty());
    assert!(list.insert(Reading(42.5)));
    assert!(!list.is_empty());
    assert_eq!(list.len(), 1);

    let cursor = list.find(&Reading(42.5));
    assert!(cursor != list.end());
    assert!(list.erase(&cursor));

    assert!(list.is_empty());
    assert_eq!(list.len(), 0);
    assert!(list.begin() == list.end());
    assert!(collect(&list).is_empty());
}

/// `find` of an absent value is the end cursor.
pub fn test_find_absent<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(1.0));
    list.insert(Reading(3.0));

    assert!(list.find(&Reading(2.0)) == list.end());
    assert!(list.find(&Reading(2.0)).is_end());
    assert!(!list.contains(&Reading(2.0)));
}

/// A cursor held across inserts and erases keeps traversing correctly:
/// inserts ahead of it become visible, and erasing the node ahead of it
/// makes the advance land on that node's successor.
pub fn test_cursor_survives_mutation<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    list.insert(Reading(8000.0));
    list.insert(Reading(5233.05));
    list.insert(Reading(8.9988));

    let mut cursor = list.begin();
    assert!(cursor != list.end());
    assert_eq!(cursor.value(), Some(&Reading(8.9988)));

    list.insert(Reading(15.6788));
    assert!(cursor.advance());
    assert_eq!(cursor.value(), Some(&Reading(15.6788)));

    assert!(cursor.advance());
    assert_eq!(cursor.value(), Some(&Reading(5233.05)));

    list.insert(Reading(10000.4050001));
    assert!(cursor.advance());
    assert_eq!(cursor.value(), Some(&Reading(8000.0)));

    assert!(list.erase(&list.find(&Reading(8000.0))));
    assert!(cursor.advance());
    assert!(cursor != list.end());
    assert_eq!(cursor.value(), Some(&Reading(10000.4050001)));
}

/// Inserting a set then iterating yields the sorted set.
pub fn test_round_trip_sorted<G: Guard>() {
    let list: SkipList<Reading, G, 16> = SkipList::new();

    let mut values: Vec<f64> = (0..500).map(|_| fastrand::f64() * 100_000.0).collect();

    for &v in &values {
        list.insert(Reading(v));
    }

    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    assert_eq!(collect(&list), values);
}
