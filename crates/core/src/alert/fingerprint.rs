use std::sync::Mutex;

use xxhash_rust::xxh64::xxh64;

use super::Alert;

const LABEL_SEP: u8 = 0xff;
const POOL_LIMIT: usize = 16;

// Scratch buffers for label serialization. Hashing runs once per alert per
// integration, so the buffers are recycled instead of reallocated.
static HASH_BUFFERS: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

fn take_buffer() -> Vec<u8> {
    HASH_BUFFERS
        .lock()
        .ok()
        .and_then(|mut pool| pool.pop())
        .unwrap_or_else(|| Vec::with_capacity(1024))
}

fn put_buffer(buf: Vec<u8>) {
    if let Ok(mut pool) = HASH_BUFFERS.lock() {
        if pool.len() < POOL_LIMIT {
            pool.push(buf);
        }
    }
}

/// Deterministic 64-bit digest of an alert's label set. Labels are fed to
/// the hash in name order as `name 0xFF value 0xFF`.
pub fn hash_alert(a: &Alert) -> u64 {
    let mut buf = take_buffer();
    buf.clear();

    for (name, value) in &a.labels {
        buf.extend_from_slice(name.as_bytes());
        buf.push(LABEL_SEP);
        buf.extend_from_slice(value.as_bytes());
        buf.push(LABEL_SEP);
    }

    let hash = xxh64(&buf, 0);
    put_buffer(buf);
    hash
}
