//! GEM object lifecycle on real hardware
//!
//! Creation, closing and fd teardown of buffer objects.

use i915_driver::{DrmDevice, GemHandle};

const OBJECT_SIZE: u64 = 16 * 1024;

#[test]
#[ignore] // Requires hardware
fn bad_close_is_einval() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let err = dev
        .gem_close(GemHandle(0x1010_1010))
        .expect_err("closing a foreign handle must fail");
    assert_eq!(err.errno(), Some(libc::EINVAL));
}

#[test]
#[ignore] // Requires hardware
fn create_close() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let handle = dev.gem_create(OBJECT_SIZE).expect("create");
    assert_ne!(handle, GemHandle(0));
    dev.gem_close(handle).expect("close");
}

#[test]
#[ignore] // Requires hardware
fn create_then_close_fd() {
    let dev = DrmDevice::open_any().expect("i915 device");
    let _handle = dev.gem_create(OBJECT_SIZE).expect("create");
    // Dropping the fd releases the object.
    drop(dev);
}
