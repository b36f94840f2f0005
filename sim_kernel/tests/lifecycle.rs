//! Task, thread and blocking behavior of the simulated kernel.

use core_types::{Architecture, KernelInfo, ResourceMode, TaskId};
use kernel_api::{restart_on_interrupt, Duration, ErrorCode, SyscallClient};
use sim_kernel::{catch_exit, current_gate, ExitScope, SimConfig, SimGate, SimulatedKernel, Terminated};
use std::time::{Duration as HostDuration, Instant as HostInstant};

const WAIT: HostDuration = HostDuration::from_secs(5);

fn boot() -> (SimulatedKernel, SyscallClient<SimGate>) {
    let kernel = SimulatedKernel::new();
    let client = kernel
        .client(kernel.spawn_root_task())
        .expect("root task is running");
    (kernel, client)
}

fn spawn_from_image(
    kernel: &SimulatedKernel,
    client: &SyscallClient<SimGate>,
    args: &[u8],
) -> TaskId {
    kernel.insert_resource("bin/worker", b"\x7fELF".to_vec());
    let image = client
        .acquire_resource("bin/worker", ResourceMode::READ)
        .unwrap();
    let child = client.spawn_task(&image, args).unwrap();
    client.release_resource(image).unwrap();
    child
}

#[test]
fn test_spawn_copies_args() {
    let (kernel, client) = boot();
    let parent = client.current_task_id().unwrap();

    let mut args = b"--verbose".to_vec();
    let child = spawn_from_image(&kernel, &client, &args);
    args.clear();

    assert_ne!(child, parent);
    assert!(kernel.is_task_running(child));
    assert_eq!(kernel.task_args(child), Some(b"--verbose".to_vec()));
    assert_eq!(kernel.task_parent(child), Some(parent));

    let child_client = kernel.client(child).unwrap();
    assert_eq!(child_client.current_task_id(), Ok(child));
}

#[test]
fn test_spawn_rejects_unusable_images() {
    let (kernel, client) = boot();

    let empty = client
        .acquire_resource("bin/empty", ResourceMode::READ_WRITE | ResourceMode::CREATE)
        .unwrap();
    assert_eq!(client.spawn_task(&empty, &[]), Err(ErrorCode::TaskCreationFailed));
    client.release_resource(empty).unwrap();

    kernel.insert_resource("bin/tool", b"code".to_vec());
    let write_only = client
        .acquire_resource("bin/tool", ResourceMode::WRITE)
        .unwrap();
    assert_eq!(client.spawn_task(&write_only, &[]), Err(ErrorCode::TaskCreationFailed));
    client.release_resource(write_only).unwrap();

    assert_eq!(kernel.task_count(), 1);
}

#[test]
fn test_task_exit_reclaims_everything() {
    let (kernel, client) = boot();
    let child = spawn_from_image(&kernel, &client, &[]);
    let child_client = kernel.client(child).unwrap();

    let _region = child_client.allocate_memory(256).unwrap();
    let _lock = child_client.create_lock().unwrap();
    let _file = child_client
        .acquire_resource("child/out", ResourceMode::WRITE | ResourceMode::CREATE)
        .unwrap();
    assert_eq!(kernel.handle_count(child), 2);
    assert_eq!(kernel.memory_in_use(), 256);

    let exit = catch_exit(|| child_client.exit_task(7)).unwrap_err();
    assert_eq!(
        exit,
        Terminated {
            task: child,
            scope: ExitScope::Task,
            code: 7
        }
    );

    assert!(!kernel.is_task_running(child));
    assert_eq!(kernel.task_exit_code(child), Some(7));
    assert_eq!(kernel.handle_count(child), 0);
    assert_eq!(kernel.memory_in_use(), 0);
    assert_eq!(child_client.current_task_id(), Err(ErrorCode::InvalidOperation));
    // Resources outlive the task that created them.
    assert_eq!(kernel.resource_contents("child/out"), Some(Vec::new()));
}

#[test]
fn test_exit_of_last_thread_ends_task() {
    let (kernel, client) = boot();
    let task = client.current_task_id().unwrap();

    let exit = catch_exit(|| client.exit_thread(3)).unwrap_err();
    assert_eq!(exit.scope, ExitScope::Thread);
    assert_eq!(exit.code, 3);
    assert_eq!(kernel.task_exit_code(task), Some(3));
}

extern "C" fn return_immediately(_arg: u64) {}

extern "C" fn exit_with_arg(code: u64) {
    if let Some(gate) = current_gate() {
        SyscallClient::new(gate).exit_thread(code as i32);
    }
}

#[test]
fn test_thread_create_and_exit() {
    let (kernel, client) = boot();
    let task = client.current_task_id().unwrap();

    let returned = client
        .create_thread(return_immediately, 4096, 0)
        .unwrap();
    assert_eq!(kernel.wait_for_thread_exit(returned, WAIT), Some(0));

    let exited = client.create_thread(exit_with_arg, 4096, 9).unwrap();
    assert_eq!(kernel.wait_for_thread_exit(exited, WAIT), Some(9));

    // The creating thread is still alive, so the task is too.
    assert!(kernel.is_task_running(task));
    assert_eq!(kernel.threads_of(task).len(), 3);
}

#[test]
fn test_thread_create_rejects_empty_stack() {
    let (_kernel, client) = boot();
    assert_eq!(
        client.create_thread(return_immediately, 0, 0),
        Err(ErrorCode::InvalidParameter)
    );
}

#[test]
fn test_sleep_lasts_at_least_the_duration() {
    let (_kernel, client) = boot();
    let start = HostInstant::now();
    client.sleep(Duration::from_millis(20)).unwrap();
    assert!(start.elapsed() >= HostDuration::from_millis(20));

    client.sleep(Duration::ZERO).unwrap();
    client.yield_now().unwrap();
}

#[test]
fn test_blocked_receive_is_interrupted() {
    let (kernel, client) = boot();
    let task = client.current_task_id().unwrap();
    let gate = client.gate().clone();

    let receiver = std::thread::spawn(move || {
        let client = SyscallClient::new(gate);
        let mut buffer = [0u8; 8];
        client.receive_message(&mut buffer)
    });

    let blocked = kernel.wait_until_blocked(task, WAIT).unwrap();
    assert!(kernel.interrupt(blocked));
    assert_eq!(receiver.join().unwrap(), Err(ErrorCode::Interrupted));
}

#[test]
fn test_pending_interrupt_cuts_next_sleep() {
    let (kernel, client) = boot();
    let task = client.current_task_id().unwrap();
    let me = kernel.threads_of(task)[0];

    assert!(kernel.interrupt(me));
    let start = HostInstant::now();
    assert_eq!(client.sleep(Duration::from_secs(60)), Err(ErrorCode::Interrupted));
    assert!(start.elapsed() < HostDuration::from_secs(30));

    assert!(kernel.interrupt(me));
    assert_eq!(
        restart_on_interrupt(|| client.sleep(Duration::from_millis(1))),
        Ok(())
    );
}

#[test]
fn test_interrupted_lock_acquire_leaves_lock_held() {
    let (kernel, client) = boot();
    let task = client.current_task_id().unwrap();
    let lock = client.create_lock().unwrap();
    client.acquire_lock(&lock).unwrap();

    let raw = lock.as_raw();
    let gate = client.gate().clone();
    let waiter = std::thread::spawn(move || {
        let client = SyscallClient::new(gate);
        let lock = std::mem::ManuallyDrop::new(unsafe { kernel_api::LockHandle::from_raw(raw) });
        let blocking = client.acquire_lock(&lock);
        let probe = client.try_acquire_lock(&lock);
        (blocking, probe)
    });

    let blocked = kernel.wait_until_blocked(task, WAIT).unwrap();
    kernel.interrupt(blocked);
    let (blocking, probe) = waiter.join().unwrap();
    assert_eq!(blocking, Err(ErrorCode::Interrupted));
    assert_eq!(probe, Err(ErrorCode::ResourceBusy));

    client.release_lock(&lock).unwrap();
    client.destroy_lock(lock).unwrap();
}

#[test]
fn test_lock_misuse() {
    let (_kernel, client) = boot();
    let lock = client.create_lock().unwrap();

    assert_eq!(client.release_lock(&lock), Err(ErrorCode::InvalidOperation));
    client.acquire_lock(&lock).unwrap();
    assert_eq!(client.acquire_lock(&lock), Err(ErrorCode::InvalidOperation));
    assert_eq!(client.try_acquire_lock(&lock), Err(ErrorCode::InvalidOperation));
    client.release_lock(&lock).unwrap();
    assert_eq!(client.try_acquire_lock(&lock), Ok(()));
    client.release_lock(&lock).unwrap();

    let file = client
        .acquire_resource("not/a/lock", ResourceMode::WRITE | ResourceMode::CREATE)
        .unwrap();
    let as_lock = unsafe { kernel_api::LockHandle::from_raw(file.as_raw()) };
    assert_eq!(client.acquire_lock(&as_lock), Err(ErrorCode::InvalidOperation));
    let _ = as_lock.into_raw();

    client.release_resource(file).unwrap();
    client.destroy_lock(lock).unwrap();
}

#[test]
fn test_messages_to_dead_or_unknown_tasks() {
    let (kernel, client) = boot();
    let child = spawn_from_image(&kernel, &client, &[]);
    kernel.kill_task(child, 0);

    assert_eq!(client.send_message(child, b"hi"), Err(ErrorCode::CommunicationError));
    assert_eq!(
        client.send_message(TaskId::from_raw(999), b"hi"),
        Err(ErrorCode::CommunicationError)
    );
    assert_eq!(
        client.send_message(TaskId::INVALID, b"hi"),
        Err(ErrorCode::InvalidParameter)
    );
}

#[test]
fn test_message_limits() {
    let kernel = SimulatedKernel::new().with_config(
        SimConfig::default()
            .with_inbox_capacity(1)
            .with_max_message_len(8),
    );
    let client = kernel.client(kernel.spawn_root_task()).unwrap();
    let me = client.current_task_id().unwrap();

    assert_eq!(
        client.send_message(me, b"way too long"),
        Err(ErrorCode::InvalidParameter)
    );
    client.send_message(me, b"one").unwrap();
    assert_eq!(client.send_message(me, b"two"), Err(ErrorCode::ResourceBusy));

    let mut buffer = [0u8; 8];
    assert_eq!(client.try_receive_message(&mut buffer), Ok(3));
    assert_eq!(client.try_receive_message(&mut buffer), Err(ErrorCode::NoMessage));
}

#[test]
fn test_handle_and_memory_limits() {
    let kernel = SimulatedKernel::new().with_config(
        SimConfig::default()
            .with_max_handles_per_task(2)
            .with_memory_limit(4096),
    );
    let client = kernel.client(kernel.spawn_root_task()).unwrap();

    let first = client.create_lock().unwrap();
    let second = client.create_lock().unwrap();
    assert_eq!(client.create_lock().err(), Some(ErrorCode::HandleLimitExceeded));
    client.destroy_lock(first).unwrap();
    client.destroy_lock(second).unwrap();

    assert_eq!(client.allocate_memory(8192).err(), Some(ErrorCode::OutOfMemory));
    let region = client.allocate_memory(4096).unwrap();
    assert_eq!(client.allocate_memory(1).err(), Some(ErrorCode::OutOfMemory));
    client.release_memory(region).unwrap();
}

#[test]
fn test_resource_naming_and_permissions() {
    let kernel = SimulatedKernel::new()
        .with_config(SimConfig::default().with_read_only_prefix("rom/"));
    kernel.insert_resource("rom/boot", b"boot".to_vec());
    let client = kernel.client(kernel.spawn_root_task()).unwrap();

    assert_eq!(
        client
            .acquire_resource("rom/new", ResourceMode::WRITE | ResourceMode::CREATE)
            .err(),
        Some(ErrorCode::PermissionDenied)
    );
    let boot = client.acquire_resource("rom/boot", ResourceMode::READ).unwrap();
    assert_eq!(client.write_resource(&boot, b"x"), Err(ErrorCode::InvalidOperation));
    client.release_resource(boot).unwrap();

    assert_eq!(
        client.acquire_resource(b"bad\0name", ResourceMode::READ).err(),
        Some(ErrorCode::NamingError)
    );
    assert_eq!(
        client.acquire_resource(vec![b'a'; 256], ResourceMode::READ).err(),
        Some(ErrorCode::NamingError)
    );
}

#[test]
fn test_resource_control_and_write_all() {
    use sim_kernel::resources::control;

    let (_kernel, client) = boot();
    let file = client
        .acquire_resource("log", ResourceMode::READ_WRITE | ResourceMode::CREATE)
        .unwrap();
    client.write_all_resource(&file, b"0123456789").unwrap();

    assert_eq!(client.control_resource(&file, control::GET_SIZE, 0), Ok(10));
    assert_eq!(client.control_resource(&file, control::GET_POSITION, 0), Ok(10));
    assert_eq!(client.control_resource(&file, control::SEEK, 4), Ok(4));
    assert_eq!(
        client.control_resource(&file, control::SEEK, 11),
        Err(ErrorCode::InvalidParameter)
    );
    assert_eq!(client.control_resource(&file, 77, 0), Err(ErrorCode::NotSupported));

    let mut buffer = [0u8; 3];
    assert_eq!(client.read_resource(&file, &mut buffer), Ok(3));
    assert_eq!(&buffer, b"456");
    client.release_resource(file).unwrap();
}

#[test]
fn test_truncate_discards_contents() {
    let (kernel, client) = boot();
    kernel.insert_resource("notes", b"stale".to_vec());
    let notes = client
        .acquire_resource("notes", ResourceMode::WRITE | ResourceMode::TRUNCATE)
        .unwrap();
    client.write_resource(&notes, b"new").unwrap();
    client.release_resource(notes).unwrap();
    assert_eq!(kernel.resource_contents("notes"), Some(b"new".to_vec()));
}

#[test]
fn test_kernel_info_and_time() {
    let (kernel, client) = boot();

    let version = kernel.config().kernel_version;
    assert_eq!(client.kernel_info(KernelInfo::VersionMajor), Ok(version.major));
    assert_eq!(client.kernel_info(KernelInfo::VersionMinor), Ok(version.minor));
    assert_eq!(client.kernel_info(KernelInfo::BuildId), Ok(kernel.config().build_id));
    assert!(client.kernel_info(KernelInfo::UptimeSeconds).is_ok());
    assert_eq!(client.kernel_architecture(), Ok(Architecture::current()));
    assert_eq!(client.kernel_info_raw(99), Err(ErrorCode::NotSupported));

    let earlier = client.system_time().unwrap();
    client.sleep(Duration::from_millis(2)).unwrap();
    let later = client.system_time().unwrap();
    assert!(later > earlier);
}

#[test]
fn test_unreportable_info_value_is_an_error() {
    let config = SimConfig {
        build_id: u64::MAX,
        ..SimConfig::default()
    };
    assert!(config.validate().is_err());
    let kernel = SimulatedKernel::new().with_config(config);
    let client = kernel.client(kernel.spawn_root_task()).unwrap();

    assert_eq!(
        client.kernel_info(KernelInfo::BuildId),
        Err(ErrorCode::InvalidParameter)
    );
    assert_eq!(client.kernel_info(KernelInfo::VersionMinor), Ok(1));
}
