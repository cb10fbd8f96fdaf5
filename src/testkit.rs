//! Test doubles for the external collaborators.
//!
//! Host tests stand in for the embedding kernel: `UserMemory` plays the MMU,
//! `MemFs` the filesystem, `TestConsole` the UART, `ScriptedLifecycle` the
//! loader (spawning a std thread per child) and `YieldScheduler` the
//! scheduler's yield hook. [`TestEnv`] wires them together and provides the
//! trap-glue role: building a user stack and dispatching syscalls.

use std::cell::UnsafeCell;
use std::collections::{BTreeMap, VecDeque};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use spin::Mutex;

use crate::console::Console;
use crate::fs::{FileHandle, FileSystem};
use crate::kernel::Kernel;
use crate::mm::{is_user_addr, AddressSpace, PAGE_MASK, PAGE_SIZE};
use crate::process::{self, Process, KILLED_STATUS};
use crate::sched::{ProcessLifecycle, Scheduler};
use crate::syscall::{self, SyscallOutcome, TrapFrame, WORD_SIZE};

/// Base of the mapped user stack page.
pub const USER_STACK: usize = 0x0805_0000;
/// Base of the mapped user data pages (two contiguous pages; the page after
/// them is deliberately left unmapped for fault tests).
pub const DATA_BASE: usize = 0x0806_0000;
/// Value preloaded into the frame's return-value slot, to observe syscalls
/// that must leave it untouched.
pub const RETVAL_UNSET: usize = 0xdead_beef;

/// One 4 KiB user page backed by host memory.
struct PageFrame(UnsafeCell<[u8; PAGE_SIZE]>);

/// A sparse page-granular user address space.
pub struct UserMemory {
    pages: Mutex<BTreeMap<usize, Box<PageFrame>>>,
}

impl UserMemory {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(BTreeMap::new()),
        }
    }

    /// Map a zero-filled page at `base` (page-aligned).
    pub fn map_page(&self, base: usize) {
        assert_eq!(base & PAGE_MASK, 0, "page base must be aligned");
        self.pages
            .lock()
            .entry(base)
            .or_insert_with(|| Box::new(PageFrame(UnsafeCell::new([0; PAGE_SIZE]))));
    }

    fn resolve(&self, addr: usize) -> Option<NonNull<u8>> {
        if !is_user_addr(addr) {
            return None;
        }
        let pages = self.pages.lock();
        let frame = pages.get(&(addr & !PAGE_MASK))?;
        // The frame's heap allocation is stable for the map's lifetime, so
        // the pointer stays valid after the lock is dropped.
        let ptr = unsafe { (frame.0.get() as *mut u8).add(addr & PAGE_MASK) };
        NonNull::new(ptr)
    }

    /// Write bytes into mapped user memory. Panics if any page is unmapped
    /// (a bug in the test, not the code under test).
    pub fn write(&self, addr: usize, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let ptr = self
                .resolve(addr + i)
                .expect("test wrote to unmapped user memory");
            unsafe { ptr.as_ptr().write(byte) };
        }
    }

    /// Read bytes back out of mapped user memory.
    pub fn read(&self, addr: usize, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let ptr = self
                    .resolve(addr + i)
                    .expect("test read from unmapped user memory");
                unsafe { ptr.as_ptr().read() }
            })
            .collect()
    }
}

/// Shared handle to a [`UserMemory`], installable as a process address space.
pub struct SharedMemory(pub Arc<UserMemory>);

impl AddressSpace for SharedMemory {
    fn translate(&self, addr: usize) -> Option<NonNull<u8>> {
        self.0.resolve(addr)
    }
}

struct OpenFileState {
    name: String,
    pos: usize,
}

/// Backing state of the in-memory filesystem, shared with the test so it can
/// seed files and count leaked handles.
#[derive(Default)]
pub struct MemFsState {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    handles: Mutex<BTreeMap<u64, OpenFileState>>,
    next_handle: AtomicU64,
}

/// In-memory filesystem collaborator.
pub struct MemFs(pub Arc<MemFsState>);

impl MemFsState {
    pub fn open_handles(&self) -> usize {
        self.handles.lock().len()
    }
}

impl FileSystem for MemFs {
    fn create(&mut self, path: &str, initial_size: usize) -> bool {
        let mut files = self.0.files.lock();
        if files.contains_key(path) {
            return false;
        }
        files.insert(path.into(), vec![0; initial_size]);
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        self.0.files.lock().remove(path).is_some()
    }

    fn open(&mut self, path: &str) -> Option<FileHandle> {
        if !self.0.files.lock().contains_key(path) {
            return None;
        }
        let raw = self.0.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        self.0.handles.lock().insert(
            raw,
            OpenFileState {
                name: path.into(),
                pos: 0,
            },
        );
        Some(FileHandle::new(raw))
    }

    fn close(&mut self, handle: FileHandle) {
        self.0.handles.lock().remove(&handle.raw());
    }

    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> usize {
        let mut handles = self.0.handles.lock();
        let Some(open) = handles.get_mut(&handle.raw()) else {
            return 0;
        };
        let files = self.0.files.lock();
        let Some(data) = files.get(&open.name) else {
            return 0;
        };
        let n = buf.len().min(data.len().saturating_sub(open.pos));
        buf[..n].copy_from_slice(&data[open.pos..open.pos + n]);
        open.pos += n;
        n
    }

    fn write(&mut self, handle: FileHandle, buf: &[u8]) -> usize {
        let mut handles = self.0.handles.lock();
        let Some(open) = handles.get_mut(&handle.raw()) else {
            return 0;
        };
        let mut files = self.0.files.lock();
        let Some(data) = files.get_mut(&open.name) else {
            return 0;
        };
        if data.len() < open.pos + buf.len() {
            data.resize(open.pos + buf.len(), 0);
        }
        data[open.pos..open.pos + buf.len()].copy_from_slice(buf);
        open.pos += buf.len();
        buf.len()
    }

    fn seek(&mut self, handle: FileHandle, pos: usize) {
        if let Some(open) = self.0.handles.lock().get_mut(&handle.raw()) {
            open.pos = pos;
        }
    }

    fn tell(&mut self, handle: FileHandle) -> usize {
        self.0
            .handles
            .lock()
            .get(&handle.raw())
            .map_or(0, |open| open.pos)
    }

    fn length(&mut self, handle: FileHandle) -> usize {
        let handles = self.0.handles.lock();
        let Some(open) = handles.get(&handle.raw()) else {
            return 0;
        };
        self.0.files.lock().get(&open.name).map_or(0, Vec::len)
    }
}

/// Captured console with scripted input.
#[derive(Default)]
pub struct ConsoleState {
    output: Mutex<Vec<u8>>,
    input: Mutex<VecDeque<u8>>,
}

pub struct TestConsole(pub Arc<ConsoleState>);

impl Console for TestConsole {
    fn read_byte(&self) -> u8 {
        self.0
            .input
            .lock()
            .pop_front()
            .expect("console input exhausted")
    }

    fn write_bytes(&self, bytes: &[u8]) {
        self.0.output.lock().extend_from_slice(bytes);
    }
}

#[derive(Clone, Copy)]
struct Program {
    loads: bool,
    exit_status: i32,
}

/// Table of programs the scripted loader knows how to "run".
#[derive(Default)]
pub struct ProgramTable {
    programs: Mutex<BTreeMap<String, Program>>,
}

/// Lifecycle collaborator that runs each child on a std thread: report the
/// load outcome, then exit with the scripted status. Unknown programs fail
/// to load.
pub struct ScriptedLifecycle(pub Arc<ProgramTable>);

impl ProcessLifecycle for ScriptedLifecycle {
    fn start(&self, kernel: Arc<Kernel>, child: Arc<Process>, cmdline: &str) {
        let name = cmdline.split_whitespace().next().unwrap_or("").to_string();
        let program = self.0.programs.lock().get(&name).copied();
        std::thread::spawn(move || {
            let pid = child.pid();
            match program {
                Some(program) if program.loads => {
                    child.set_address_space(Box::new(SharedMemory(Arc::new(UserMemory::new()))));
                    kernel.on_child_loaded(pid, true);
                    process::exit(&kernel, &child, program.exit_status);
                }
                _ => {
                    kernel.on_child_loaded(pid, false);
                    process::exit(&kernel, &child, KILLED_STATUS);
                }
            }
        });
    }
}

/// Scheduler yield hook backed by the host scheduler.
pub struct YieldScheduler;

impl Scheduler for YieldScheduler {
    fn yield_now(&self) {
        std::thread::yield_now();
    }
}

/// A full test environment: kernel, mocks, and a root process with a mapped
/// stack page and two mapped data pages.
pub struct TestEnv {
    pub kernel: Arc<Kernel>,
    pub root: Arc<Process>,
    pub mem: Arc<UserMemory>,
    fs: Arc<MemFsState>,
    console: Arc<ConsoleState>,
    programs: Arc<ProgramTable>,
}

impl TestEnv {
    pub fn new() -> Self {
        let fs = Arc::new(MemFsState::default());
        let console = Arc::new(ConsoleState::default());
        let programs = Arc::new(ProgramTable::default());
        let kernel = Kernel::new(
            Box::new(MemFs(Arc::clone(&fs))),
            Box::new(TestConsole(Arc::clone(&console))),
            Box::new(ScriptedLifecycle(Arc::clone(&programs))),
            Box::new(YieldScheduler),
        );

        let mem = Arc::new(UserMemory::new());
        mem.map_page(USER_STACK);
        mem.map_page(DATA_BASE);
        mem.map_page(DATA_BASE + PAGE_SIZE);

        let root = kernel.spawn_root("root", Box::new(SharedMemory(Arc::clone(&mem))));

        Self {
            kernel,
            root,
            mem,
            fs,
            console,
            programs,
        }
    }

    /// Seed a file directly into the filesystem.
    pub fn create_file(&self, name: &str, contents: &[u8]) {
        self.fs.files.lock().insert(name.into(), contents.to_vec());
    }

    /// Number of file handles currently open across all processes.
    pub fn open_handles(&self) -> usize {
        self.fs.open_handles()
    }

    /// Everything written to the console so far.
    pub fn console_output(&self) -> String {
        String::from_utf8(self.console.output.lock().clone()).unwrap()
    }

    /// Queue console input for stdin reads.
    pub fn push_input(&self, bytes: &[u8]) {
        self.console.input.lock().extend(bytes.iter().copied());
    }

    /// Register a program for the scripted loader.
    pub fn add_program(&self, name: &str, loads: bool, exit_status: i32) {
        self.programs
            .programs
            .lock()
            .insert(name.into(), Program { loads, exit_status });
    }

    pub fn write_user(&self, addr: usize, bytes: &[u8]) {
        self.mem.write(addr, bytes);
    }

    pub fn read_user(&self, addr: usize, len: usize) -> Vec<u8> {
        self.mem.read(addr, len)
    }

    /// Write a NUL-terminated string into user memory.
    pub fn put_cstr(&self, addr: usize, s: &str) {
        self.mem.write(addr, s.as_bytes());
        self.mem.write(addr + s.len(), &[0]);
    }

    /// Lay out words on the user stack as the syscall ABI expects.
    pub fn write_words(&self, addr: usize, words: &[usize]) {
        for (i, word) in words.iter().enumerate() {
            self.mem.write(addr + i * WORD_SIZE, &word.to_ne_bytes());
        }
    }

    /// Push a syscall frame at the stack base and dispatch it as root.
    pub fn syscall(&self, words: &[usize]) -> (SyscallOutcome, isize) {
        self.write_words(USER_STACK, words);
        self.dispatch_at(USER_STACK)
    }

    /// Dispatch with an arbitrary trapped stack pointer.
    pub fn dispatch_at(&self, sp: usize) -> (SyscallOutcome, isize) {
        let mut frame = TrapFrame {
            user_sp: sp,
            return_value: RETVAL_UNSET,
        };
        let outcome = syscall::dispatch(&self.kernel, &self.root, &mut frame);
        (outcome, frame.return_value as isize)
    }
}
