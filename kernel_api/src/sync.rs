//! Kernel locks
//!
//! Locks are not re-entrant: a thread acquiring a lock it already holds gets
//! whatever the kernel decides, never a second hold.

use crate::abi::{Syscall, ACQUIRE_NONBLOCKING};
use crate::client::SyscallClient;
use crate::error::SyscallResult;
use crate::gate::SyscallGate;
use crate::handle::LockHandle;

impl<G: SyscallGate> SyscallClient<G> {
    /// Creates an unlocked lock.
    pub fn create_lock(&self) -> SyscallResult<LockHandle> {
        let value = self.call_by_value(Syscall::LockCreate, &[])?;
        LockHandle::from_kernel(value)
    }

    /// Blocks until the lock is free, then holds it.
    ///
    /// Interruptible: on `Interrupted` the lock was not taken.
    pub fn acquire_lock(&self, lock: &LockHandle) -> SyscallResult<()> {
        self.call_by_value(Syscall::LockAcquire, &[lock.word(), 0])
            .map(drop)
    }

    /// Takes the lock if it is free, failing with `ResourceBusy` otherwise.
    pub fn try_acquire_lock(&self, lock: &LockHandle) -> SyscallResult<()> {
        self.call_by_value(Syscall::LockAcquire, &[lock.word(), ACQUIRE_NONBLOCKING])
            .map(drop)
    }

    /// Releases a lock held by the calling thread. Releasing a lock this
    /// thread does not hold fails with `InvalidOperation`.
    pub fn release_lock(&self, lock: &LockHandle) -> SyscallResult<()> {
        self.call_by_value(Syscall::LockRelease, &[lock.word()])
            .map(drop)
    }

    /// Releases the lock handle itself.
    pub fn destroy_lock(&self, lock: LockHandle) -> SyscallResult<()> {
        let raw = lock.into_raw();
        self.call_by_value(Syscall::ResourceRelease, &[raw.as_raw()])
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::ScriptedGate;
    use crate::error::ErrorCode;

    #[test]
    fn test_blocking_and_nonblocking_flags() {
        let client = SyscallClient::new(ScriptedGate::returning(&[3, 0, -6]));
        let lock = client.create_lock().unwrap();
        client.acquire_lock(&lock).unwrap();
        assert_eq!(client.gate().last_call(), (12, [3, 0, 0, 0, 0]));
        assert_eq!(client.try_acquire_lock(&lock).unwrap_err(), ErrorCode::ResourceBusy);
        assert_eq!(client.gate().last_call(), (12, [3, 1, 0, 0, 0]));
        let _ = lock.into_raw();
    }

    #[test]
    fn test_release_foreign_lock() {
        let client = SyscallClient::new(ScriptedGate::returning(&[3, -9]));
        let lock = client.create_lock().unwrap();
        assert_eq!(client.release_lock(&lock).unwrap_err(), ErrorCode::InvalidOperation);
        let _ = lock.into_raw();
    }

    #[test]
    fn test_destroy_releases_handle() {
        let client = SyscallClient::new(ScriptedGate::returning(&[3, 0]));
        let lock = client.create_lock().unwrap();
        client.destroy_lock(lock).unwrap();
        assert_eq!(client.gate().last_call(), (8, [3, 0, 0, 0, 0]));
    }
}
