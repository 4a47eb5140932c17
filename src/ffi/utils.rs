//! FFI utilities and handle management

use std::{
    collections::HashMap,
    ffi::{c_char, CStr, CString},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::buffers::{BufferPool, MaintenanceHandle};

// Global handle management
lazy_static::lazy_static! {
    pub static ref HANDLE_REGISTRY: Mutex<HandleRegistry> = Mutex::new(HandleRegistry::new());
}

/// A pool owned by the C side, with its maintenance thread if any
pub struct PoolEntry {
    pub pool: Arc<BufferPool>,
    pub maintenance: Option<MaintenanceHandle>,
}

pub struct HandleRegistry {
    pub pools: HashMap<usize, PoolEntry>,
    pub next_id: usize,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn store_pool(&mut self, entry: PoolEntry) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.pools.insert(id, entry);
        id
    }

    pub fn get_pool(&self, id: usize) -> Option<Arc<BufferPool>> {
        self.pools.get(&id).map(|entry| Arc::clone(&entry.pool))
    }

    pub fn remove_pool(&mut self, id: usize) -> Option<PoolEntry> {
        self.pools.remove(&id)
    }
}

/// Convert C string to Rust String
pub fn c_str_to_string(c_str: *const c_char) -> Option<String> {
    if c_str.is_null() {
        return None;
    }
    // SAFETY: caller passes a NUL-terminated string.
    unsafe { CStr::from_ptr(c_str).to_str().ok().map(str::to_owned) }
}

/// Convert Rust String to C string (caller must free with daguerre_free_string)
pub fn string_to_c_str(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a C string allocated by this library
#[no_mangle]
pub extern "C" fn daguerre_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
