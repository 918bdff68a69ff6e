//! Global names (flink / open) on real hardware

use i915_driver::{DrmDevice, FlinkName, GemHandle};

const OBJECT_SIZE: u64 = 16 * 1024;

#[test]
#[ignore] // Requires hardware
fn flink_and_open() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let handle = dev.gem_create(OBJECT_SIZE).expect("create");

    let name = dev.gem_flink(handle).expect("flink");
    let (opened, size) = dev.gem_open(name).expect("open");
    assert_eq!(size, OBJECT_SIZE);
    assert_ne!(opened, GemHandle(0));
}

#[test]
#[ignore] // Requires hardware
fn double_flink_returns_same_name() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let handle = dev.gem_create(OBJECT_SIZE).expect("create");

    let first = dev.gem_flink(handle).expect("flink");
    let second = dev.gem_flink(handle).expect("flink again");
    assert_eq!(first, second);
}

#[test]
#[ignore] // Requires hardware
fn bad_flink_is_enoent() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let err = dev.gem_flink(GemHandle(0x1010_1010)).expect_err("bad flink");
    assert_eq!(err.errno(), Some(libc::ENOENT));
}

#[test]
#[ignore] // Requires hardware
fn bad_open_is_enoent() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let err = dev.gem_open(FlinkName(0x1010_1010)).expect_err("bad open");
    assert_eq!(err.errno(), Some(libc::ENOENT));
}

#[test]
#[ignore] // Requires hardware
fn name_outlives_creating_handle() {
    let owner = DrmDevice::open_any().expect("i915 device");
    let other = DrmDevice::open_any().expect("second fd");

    let handle = owner.gem_create(OBJECT_SIZE).expect("create");
    let name = owner.gem_flink(handle).expect("flink");

    let (_opened, _) = other.gem_open(name).expect("open from second fd");
    owner.gem_close(handle).expect("close owner handle");
    drop(owner);

    // The second fd's reference keeps the name alive.
    let (_reopened, size) = other.gem_open(name).expect("reopen");
    assert_eq!(size, OBJECT_SIZE);
}
