//! Calibration persistence against a shared RAM store.

use firenode::calibration::{CalibrationStore, LoadOutcome};
use firenode::error::{CalibrationError, EngineError, StorageError};

use crate::mock_hw::{FakeEngine, MemStore};

const BLOB: u8 = 221;

#[test]
fn erased_storage_zeroes_marker_and_blob_region() {
    let mem = MemStore::erased();
    let mut store = CalibrationStore::new(mem.clone());
    let mut engine = FakeEngine::new(BLOB);

    assert_eq!(store.load(&mut engine).unwrap(), LoadOutcome::NoPriorState);

    let bytes = mem.snapshot();
    assert!(bytes[..=BLOB as usize].iter().all(|b| *b == 0));
    assert!(bytes[BLOB as usize + 1..].iter().all(|b| *b == 0xFF));
    assert_eq!(mem.commits(), 1);
    assert!(engine.installed.is_none());
}

#[test]
fn zeroed_storage_is_zeroed_again_without_restore() {
    // Marker 0 != 221: still no prior state.
    let mem = MemStore::filled(0);
    let mut store = CalibrationStore::new(mem.clone());
    let mut engine = FakeEngine::new(BLOB);

    assert_eq!(store.load(&mut engine).unwrap(), LoadOutcome::NoPriorState);
    assert!(engine.installed.is_none());
}

#[test]
fn valid_blob_is_installed_without_rewriting() {
    let mem = MemStore::filled(0x42);
    mem.poke(0, BLOB);
    let mut store = CalibrationStore::new(mem.clone());
    let mut engine = FakeEngine::new(BLOB);

    match store.load(&mut engine).unwrap() {
        LoadOutcome::Restored(blob) => assert!(blob.iter().all(|b| *b == 0x42)),
        other => panic!("expected restore, got {other:?}"),
    }
    assert_eq!(engine.installed.as_deref(), Some(&[0x42; BLOB as usize][..]));
    assert_eq!(mem.writes(), 0);
    assert_eq!(mem.commits(), 0);
}

#[test]
fn save_then_load_is_bit_exact() {
    let mem = MemStore::erased();
    let mut engine = FakeEngine::new(BLOB);
    let expected = engine.state.clone();

    CalibrationStore::new(mem.clone()).save(&mut engine).unwrap();
    assert_eq!(mem.snapshot()[0], BLOB);

    let mut next = FakeEngine::new(BLOB);
    next.state = vec![0; BLOB as usize];
    let outcome = CalibrationStore::new(mem.clone()).load(&mut next).unwrap();
    assert!(matches!(outcome, LoadOutcome::Restored(_)));
    assert_eq!(next.installed, Some(expected));
}

#[test]
fn write_failure_mid_blob_leaves_marker_unchanged() {
    let mut mem = MemStore::filled(0);
    mem.fail_write_at = Some(100);
    let mut store = CalibrationStore::new(mem.clone());
    let mut engine = FakeEngine::new(BLOB);

    assert_eq!(
        store.save(&mut engine),
        Err(CalibrationError::Storage(StorageError::WriteFailed))
    );
    // Marker never written, so the next boot still sees no valid blob.
    assert_eq!(mem.snapshot()[0], 0);
    assert_eq!(mem.commits(), 0);
}

#[test]
fn export_failure_leaves_storage_untouched() {
    let mem = MemStore::filled(0x11);
    let mut store = CalibrationStore::new(mem.clone());
    let mut engine = FakeEngine::new(BLOB);
    engine.fail_get_state = true;

    assert_eq!(
        store.save(&mut engine),
        Err(CalibrationError::Engine(EngineError::StateUnavailable))
    );
    assert!(mem.snapshot().iter().all(|b| *b == 0x11));
    assert_eq!(mem.writes(), 0);
}

#[test]
fn short_export_is_a_size_mismatch() {
    let mem = MemStore::erased();
    let mut store = CalibrationStore::new(mem.clone());
    let mut engine = FakeEngine::new(BLOB);
    engine.state.truncate(10);

    assert_eq!(
        store.save(&mut engine),
        Err(CalibrationError::SizeMismatch {
            declared: BLOB,
            actual: 10
        })
    );
    assert_eq!(mem.writes(), 0);
}

#[test]
fn failed_zero_fill_is_an_error_not_success() {
    let mut mem = MemStore::erased();
    mem.fail_write_at = Some(50);
    let mut store = CalibrationStore::new(mem);
    let mut engine = FakeEngine::new(BLOB);

    assert!(matches!(
        store.load(&mut engine),
        Err(CalibrationError::Storage(StorageError::WriteFailed))
    ));
}
