use std::sync::Arc;

use cuds_container::DataContainer;
use cuds_result::Error;
use cuds_storage::{Group, MemPager, TableStore};
use cuds_table::{
    Coordinates, CudsItems, DataContainerTable, IndexedDataContainerTable, Item,
    record_description,
};
use cuds_types::{KeySpace, ScalarType, Uuid, Value, cuba};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn abc() -> Arc<KeySpace> {
    Arc::new(
        KeySpace::builder()
            .scalar("A", ScalarType::Int32)
            .array("B", ScalarType::Float64, &[3])
            .scalar("C", ScalarType::Text { max_len: 8 })
            .build()
            .unwrap(),
    )
}

fn group(pager: &Arc<MemPager>) -> Group<MemPager> {
    TableStore::open(Arc::clone(pager)).unwrap().group("mesh")
}

fn with_a(ks: &Arc<KeySpace>, a: i32) -> DataContainer {
    let mut c = DataContainer::with_keyspace(Arc::clone(ks));
    c.set_by_name("a", a).unwrap();
    c
}

fn node(i: u128) -> Item<Coordinates> {
    let mut data = DataContainer::with_keyspace(cuba::keyspace());
    data.set(cuba::LABEL, i as i32).unwrap();
    data.set(cuba::VELOCITY, [0.0, 1.0, i as f64]).unwrap();
    Item::new(Uuid::from_u128(i), Coordinates([i as f64, 0.5, -2.0]), data)
}

fn nodes(pager: &Arc<MemPager>) -> CudsItems<MemPager, Coordinates> {
    CudsItems::open(&group(pager), "nodes", cuba::keyspace(), None).unwrap()
}

#[test]
fn setting_the_same_uid_twice_replaces() {
    let ks = abc();
    let pager = Arc::new(MemPager::new());
    let mut table = DataContainerTable::open(&group(&pager), "abc", Arc::clone(&ks), None).unwrap();
    let u = Uuid::from_u128(1);

    table.set(u, &with_a(&ks, 1)).unwrap();
    assert_eq!(table.len().unwrap(), 1);
    table.set(u, &with_a(&ks, 2)).unwrap();
    assert_eq!(table.len().unwrap(), 1);
    assert_eq!(table.get(u).unwrap(), with_a(&ks, 2));
}

#[test]
fn upserting_an_identical_value_is_idempotent() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        DataContainerTable::open(&group(&pager), "points", cuba::keyspace(), None).unwrap();
    let other = Uuid::from_u128(9);
    table.set(other, &node(9).data).unwrap();

    let u = Uuid::from_u128(3);
    let c = node(3).data;
    table.set(u, &c).unwrap();
    let len = table.len().unwrap();
    assert_eq!(table.get(u).unwrap(), c);

    table.set(u, &c).unwrap();
    assert_eq!(table.len().unwrap(), len);
    assert_eq!(table.get(u).unwrap(), c);
    assert_eq!(table.uids(), &[other, u]);
}

#[test]
fn removed_uids_are_gone() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    for i in 0..5 {
        table.add_safe(&node(i)).unwrap();
    }
    let u = Uuid::from_u128(2);
    table.remove(u).unwrap();

    assert!(!table.contains(u));
    assert!(matches!(table.get(u), Err(Error::RecordNotFound(id)) if id == u));
    assert!(matches!(table.remove(u), Err(Error::RecordNotFound(_))));
    assert_eq!(table.len().unwrap(), 4);

    // rows after the removed one moved down and are still found
    assert_eq!(table.get(Uuid::from_u128(4)).unwrap(), node(4));
    assert_eq!(table.get(Uuid::from_u128(1)).unwrap(), node(1));
}

#[test]
fn removing_the_only_item_leaves_a_usable_empty_table() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    let u = table.add_safe(&node(1)).unwrap();

    table.remove(u).unwrap();
    assert_eq!(table.len().unwrap(), 0);
    assert!(table.is_empty().unwrap());
    assert!(table.uids().is_empty());

    table.add_safe(&node(1)).unwrap();
    table
        .set(Uuid::from_u128(2), &Coordinates::default(), &node(2).data)
        .unwrap();
    assert_eq!(table.len().unwrap(), 2);
    assert_eq!(table.get(u).unwrap(), node(1));
}

#[test]
fn iter_sequence_follows_the_given_order() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    for i in 0..6 {
        table.add_safe(&node(i)).unwrap();
    }
    let mut rng = StdRng::seed_from_u64(42);
    let mut order: Vec<Uuid> = (0..12)
        .map(|_| Uuid::from_u128(rng.random_range(0..6)))
        .collect();
    order.shuffle(&mut rng);

    let via_sequence: Vec<_> = table
        .iter_sequence(order.iter().copied())
        .map(|item| item.unwrap())
        .collect();
    let one_by_one: Vec<_> = order.iter().map(|u| table.get(*u).unwrap()).collect();
    assert_eq!(via_sequence, one_by_one);
}

#[test]
fn iter_sequence_fails_lazily_at_an_unknown_uid() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    table.add_safe(&node(1)).unwrap();
    table.add_safe(&node(2)).unwrap();

    let missing = Uuid::from_u128(77);
    let mut seq = table.iter_sequence([Uuid::from_u128(2), missing, Uuid::from_u128(1)]);
    assert_eq!(seq.next().unwrap().unwrap(), node(2));
    assert!(matches!(
        seq.next().unwrap(),
        Err(Error::RecordNotFound(id)) if id == missing
    ));
}

#[test]
fn iteration_is_in_storage_order() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    for i in [5, 1, 3] {
        table.add_safe(&node(i)).unwrap();
    }
    let uids: Vec<_> = table.iter().map(|item| item.unwrap().uid.unwrap()).collect();
    assert_eq!(uids, table.uids());
    assert_eq!(uids, vec![Uuid::from_u128(5), Uuid::from_u128(1), Uuid::from_u128(3)]);
}

#[test]
fn add_safe_and_update_existing_guard_presence() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    table.add_safe(&node(1)).unwrap();

    assert!(matches!(
        table.add_safe(&node(1)),
        Err(Error::RecordAlreadyExists(_))
    ));
    assert!(matches!(
        table.update_existing(&node(2)),
        Err(Error::RecordNotFound(_))
    ));

    let mut changed = node(1);
    changed.fields = Coordinates([9.0, 9.0, 9.0]);
    changed.data.set(cuba::LABEL, 100i32).unwrap();
    table.update_existing(&changed).unwrap();
    assert_eq!(table.get(Uuid::from_u128(1)).unwrap(), changed);
    assert_eq!(table.len().unwrap(), 1);
}

#[test]
fn items_without_a_uid_are_rejected() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    let mut anonymous = node(1);
    anonymous.uid = None;

    for result in [
        table.add_safe(&anonymous).map(|_| ()),
        table.add_unsafe(&anonymous).map(|_| ()),
        table.update_existing(&anonymous),
    ] {
        assert!(matches!(result, Err(Error::InvalidArgumentError(_))));
    }
    assert_eq!(table.len().unwrap(), 0);
}

#[test]
fn duplicate_uids_from_add_unsafe_resolve_to_the_first_row() {
    let pager = Arc::new(MemPager::new());
    let mut table = nodes(&pager);
    let first = node(1);
    let mut second = node(1);
    second.data.set(cuba::LABEL, -1i32).unwrap();

    table.add_unsafe(&first).unwrap();
    table.add_unsafe(&second).unwrap();
    assert_eq!(table.len().unwrap(), 2);
    assert_eq!(table.get(Uuid::from_u128(1)).unwrap(), first);

    table.remove(Uuid::from_u128(1)).unwrap();
    assert_eq!(table.get(Uuid::from_u128(1)).unwrap(), second);
}

#[test]
fn reopening_rebuilds_the_uid_index() {
    let pager = Arc::new(MemPager::new());
    {
        let mut table = nodes(&pager);
        for i in 0..4 {
            table.add_safe(&node(i)).unwrap();
        }
        table.remove(Uuid::from_u128(0)).unwrap();
    }
    let table = nodes(&pager);
    assert_eq!(table.len().unwrap(), 3);
    assert!(!table.contains(Uuid::from_u128(0)));
    assert_eq!(table.get(Uuid::from_u128(3)).unwrap(), node(3));
}

#[test]
fn diverging_sub_tables_are_an_internal_error() {
    let pager = Arc::new(MemPager::new());
    {
        let mut table = nodes(&pager);
        table.add_safe(&node(1)).unwrap();
    }
    {
        let data_group = group(&pager).child("nodes");
        let mut data =
            IndexedDataContainerTable::open(&data_group, "data", cuba::keyspace(), None).unwrap();
        data.append(&node(2).data).unwrap();
    }
    let reopened = CudsItems::<MemPager, Coordinates>::open(
        &group(&pager),
        "nodes",
        cuba::keyspace(),
        None,
    );
    assert!(matches!(reopened, Err(Error::Internal(_))));
}

#[test]
fn reduced_data_tables_drop_extra_keys() {
    let ks = cuba::keyspace();
    let record = record_description(Arc::clone(&ks), [cuba::LABEL]).unwrap();
    let pager = Arc::new(MemPager::new());
    let mut table = DataContainerTable::open(&group(&pager), "labels", ks, Some(&record)).unwrap();

    let u = Uuid::from_u128(5);
    table.set(u, &node(5).data).unwrap();
    let back = table.get(u).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back.get(cuba::LABEL).unwrap(), &Value::Int32(5));

    let pairs: Vec<_> = table.iter().map(|p| p.unwrap()).collect();
    assert_eq!(pairs, vec![(u, back)]);
}

#[test]
fn returned_containers_are_detached_from_the_table() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        DataContainerTable::open(&group(&pager), "points", cuba::keyspace(), None).unwrap();
    let u = Uuid::from_u128(1);
    table.set(u, &node(1).data).unwrap();

    let mut copy = table.get(u).unwrap();
    copy.set(cuba::LABEL, 1000i32).unwrap();
    assert_eq!(table.get(u).unwrap(), node(1).data);

    let seq: Vec<_> = table.iter_sequence([u, u]).map(|c| c.unwrap()).collect();
    assert_eq!(seq, vec![node(1).data, node(1).data]);
}
