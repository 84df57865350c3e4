use std::sync::Arc;

use arrow::array::{Array, FixedSizeListArray, Int32Array};
use cuds_container::DataContainer;
use cuds_result::Error;
use cuds_storage::{Group, MemPager, RowTableConfig, TableStore};
use cuds_table::{IndexedDataContainerTable, MASK_COLUMN, record_description};
use cuds_types::{KeySpace, ScalarType, Uuid, Value, cuba};
use rand::rngs::StdRng;
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
    TableStore::open(Arc::clone(pager)).unwrap().group("particles")
}

fn particle(i: i32) -> DataContainer {
    let mut c = DataContainer::with_keyspace(cuba::keyspace());
    c.set(cuba::UID, Uuid::from_u128(i as u128)).unwrap();
    c.set(cuba::NAME, format!("p{i}")).unwrap();
    c.set(cuba::MASS, f64::from(i) * 0.5).unwrap();
    c.set(cuba::VELOCITY, [f64::from(i), 0.0, -1.0]).unwrap();
    c.set(cuba::STATUS, i).unwrap();
    c.set(cuba::STRESS_TENSOR, [[f64::from(i); 3]; 3]).unwrap();
    c.set(cuba::PERIODIC, [true, false, i % 2 == 0]).unwrap();
    c
}

#[test]
fn absent_keys_come_back_absent() {
    let ks = abc();
    let pager = Arc::new(MemPager::new());
    let mut table = IndexedDataContainerTable::open(&group(&pager), "abc", Arc::clone(&ks), None)
        .unwrap();

    let mut c = DataContainer::with_keyspace(Arc::clone(&ks));
    c.set_by_name("A", 5i32).unwrap();
    c.set_by_name("C", "x").unwrap();
    assert_eq!(table.append(&c).unwrap(), 0);

    let batch = table.to_record_batch().unwrap();
    let mask = batch
        .column_by_name(MASK_COLUMN)
        .unwrap()
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .unwrap()
        .value(0);
    let mask = mask
        .as_any()
        .downcast_ref::<arrow::array::BooleanArray>()
        .unwrap();
    assert_eq!(
        (0..mask.len()).map(|i| mask.value(i)).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    let a = batch
        .column_by_name("a")
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert_eq!(a.value(0), 5);

    let back = table.get(0).unwrap();
    assert_eq!(back, c);
    assert_eq!(back.len(), 2);
    assert!(matches!(
        back.get(ks.lookup("B").unwrap()),
        Err(Error::KeyNotFound(_))
    ));
}

#[test]
fn containers_with_only_table_keys_round_trip() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "full", cuba::keyspace(), None).unwrap();
    for i in 0..20 {
        assert_eq!(table.append(&particle(i)).unwrap(), i as usize);
    }
    assert_eq!(table.len(), 20);
    for i in 0..20 {
        assert_eq!(table.get(i as usize).unwrap(), particle(i));
    }
}

#[test]
fn keys_without_a_column_are_dropped() {
    let ks = cuba::keyspace();
    let record = record_description(Arc::clone(&ks), [cuba::MASS, cuba::VELOCITY]).unwrap();
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "reduced", ks, Some(&record)).unwrap();

    let mut c = particle(3);
    c.set(cuba::PHYSICS_EQUATION, "navier-stokes").unwrap();
    let expected: Vec<_> = c
        .iter()
        .filter(|(k, _)| table.layout().position(*k).is_some())
        .map(|(k, v)| (k, v.clone()))
        .collect();
    assert_eq!(expected.len(), 2);

    let position = table.append(&c).unwrap();
    let back = table.get(position).unwrap();
    assert_eq!(back.iter().map(|(k, v)| (k, v.clone())).collect::<Vec<_>>(), expected);
    assert_eq!(back.restricted_keys().len(), 2);
    assert!(matches!(
        back.clone().set(cuba::NAME, "nope"),
        Err(Error::InvalidKey(_))
    ));
}

#[test]
fn positions_outside_the_table_are_rejected() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "t", cuba::keyspace(), None).unwrap();
    table.append(&particle(0)).unwrap();

    assert!(matches!(
        table.get(1),
        Err(Error::IndexOutOfRange { index: 1, len: 1 })
    ));
    assert!(matches!(
        table.set(3, &particle(3)),
        Err(Error::IndexOutOfRange { index: 3, len: 1 })
    ));
    assert!(matches!(
        table.remove(1),
        Err(Error::IndexOutOfRange { index: 1, len: 1 })
    ));
    assert_eq!(table.len(), 1);
}

#[test]
fn set_replaces_the_whole_row() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "t", cuba::keyspace(), None).unwrap();
    table.append(&particle(1)).unwrap();

    let mut only_mass = DataContainer::with_keyspace(cuba::keyspace());
    only_mass.set(cuba::MASS, 9.0).unwrap();
    table.set(0, &only_mass).unwrap();

    assert_eq!(table.get(0).unwrap(), only_mass);
}

#[test]
fn values_that_do_not_fit_leave_the_table_untouched() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "t", cuba::keyspace(), None).unwrap();
    table.append(&particle(1)).unwrap();

    let mut bad = particle(2);
    bad.set(cuba::VELOCITY, vec![1.0, 2.0]).unwrap();
    assert!(matches!(
        table.append(&bad),
        Err(Error::InvalidArgumentError(_))
    ));
    assert!(matches!(
        table.set(0, &bad),
        Err(Error::InvalidArgumentError(_))
    ));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0).unwrap(), particle(1));
}

#[test]
fn numbers_read_back_equal_after_widening() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "t", cuba::keyspace(), None).unwrap();

    let mut c = DataContainer::with_keyspace(cuba::keyspace());
    c.set(cuba::MASS, 3i32).unwrap();
    c.set(cuba::LABEL, Value::Int64(7)).unwrap();
    c.set(cuba::VELOCITY, [1i32, 2, 3]).unwrap();
    let position = table.append(&c).unwrap();

    let back = table.get(position).unwrap();
    assert_eq!(back, c);
    assert!(matches!(back.get(cuba::MASS).unwrap(), Value::Float64(m) if *m == 3.0));
    assert!(matches!(back.get(cuba::LABEL).unwrap(), Value::Int32(7)));
}

#[test]
fn text_with_a_nul_character_is_rejected() {
    let ks = abc();
    let pager = Arc::new(MemPager::new());
    let mut table = IndexedDataContainerTable::open(&group(&pager), "abc", Arc::clone(&ks), None)
        .unwrap();

    let mut c = DataContainer::with_keyspace(Arc::clone(&ks));
    c.set_by_name("C", "ab").unwrap();
    table.append(&c).unwrap();

    let mut bad = c.clone();
    bad.set_by_name("C", "ab\0").unwrap();
    assert!(matches!(
        table.append(&bad),
        Err(Error::InvalidArgumentError(_))
    ));
    assert!(matches!(
        table.set(0, &bad),
        Err(Error::InvalidArgumentError(_))
    ));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0).unwrap(), c);
}

#[test]
fn removing_compacts_and_the_last_row_recreates() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "t", cuba::keyspace(), None).unwrap();
    for i in 0..3 {
        table.append(&particle(i)).unwrap();
    }

    table.remove(1).unwrap();
    let left: Vec<_> = table.iter().map(|c| c.unwrap()).collect();
    assert_eq!(left, vec![particle(0), particle(2)]);

    table.remove(0).unwrap();
    table.remove(0).unwrap();
    assert_eq!(table.len(), 0);
    assert!(table.is_empty());

    assert_eq!(table.append(&particle(7)).unwrap(), 0);
    assert_eq!(table.get(0).unwrap(), particle(7));
}

#[test]
fn iteration_restarts_from_the_first_row() {
    let pager = Arc::new(MemPager::new());
    let mut table =
        IndexedDataContainerTable::open(&group(&pager), "t", cuba::keyspace(), None).unwrap();
    for i in 0..4 {
        table.append(&particle(i)).unwrap();
    }
    let mut first = table.iter();
    assert_eq!(first.next().unwrap().unwrap(), particle(0));

    let again: Vec<_> = table.iter().map(|c| c.unwrap()).collect();
    assert_eq!(again.len(), 4);
    assert_eq!(again[0], particle(0));
}

#[test]
fn reopening_keeps_rows_and_layout() {
    let ks = cuba::keyspace();
    let record = record_description(Arc::clone(&ks), [cuba::NAME, cuba::MASS]).unwrap();
    let pager = Arc::new(MemPager::new());
    {
        let mut table = IndexedDataContainerTable::open(
            &group(&pager),
            "reduced",
            Arc::clone(&ks),
            Some(&record),
        )
        .unwrap();
        table.append(&particle(4)).unwrap();
    }

    let reopened =
        IndexedDataContainerTable::open(&group(&pager), "reduced", Arc::clone(&ks), None).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.layout().len(), 2);
    let back = reopened.get(0).unwrap();
    assert_eq!(back.get(cuba::NAME).unwrap(), &Value::from("p4"));
    assert_eq!(back.get(cuba::MASS).unwrap(), &Value::Float64(2.0));

    let other = record_description(Arc::clone(&ks), [cuba::MASS]).unwrap();
    assert!(matches!(
        IndexedDataContainerTable::open(&group(&pager), "reduced", ks, Some(&other)),
        Err(Error::InvalidArgumentError(_))
    ));
}

#[test]
fn random_sparse_containers_round_trip() {
    let ks = cuba::keyspace();
    let pager = Arc::new(MemPager::new());
    let mut table = IndexedDataContainerTable::open_with_config(
        &group(&pager),
        "sparse",
        Arc::clone(&ks),
        None,
        RowTableConfig { page_bytes: 1024 },
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut expected = Vec::new();

    for _ in 0..50 {
        let mut c = DataContainer::with_keyspace(Arc::clone(&ks));
        if rng.random_bool(0.5) {
            c.set(cuba::MASS, rng.random_range(-1.0e6..1.0e6)).unwrap();
        }
        if rng.random_bool(0.5) {
            c.set(cuba::LABEL, rng.random_range(i32::MIN..i32::MAX)).unwrap();
        }
        if rng.random_bool(0.5) {
            let v: [f64; 3] = [rng.random(), rng.random(), rng.random()];
            c.set(cuba::FORCE, v).unwrap();
        }
        if rng.random_bool(0.5) {
            c.set(cuba::MATERIAL, Uuid::from_u128(rng.random())).unwrap();
        }
        if rng.random_bool(0.3) {
            c.set(cuba::COMPUTATIONAL_METHOD, "dropped").unwrap();
        }
        table.append(&c).unwrap();
        c.remove(cuba::COMPUTATIONAL_METHOD).ok();
        expected.push(c);
    }

    let stored: Vec<_> = table.iter().map(|c| c.unwrap()).collect();
    assert_eq!(stored, expected);
}
