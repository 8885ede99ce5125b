//! A capacity-bounded, append-only byte stream exposed as a virtual file
//! (the "changing file" of §4.7): writers append, readers see a sliding
//! window of the most recent bytes. Ported from
//! `original_source/src/stdio_ring_buffer.h`'s `ring_buffer_s` and its
//! `stdio_ring_buffer_get_data(offset, buf, len)` windowed-read contract,
//! guarded by `spin::Mutex` since the original runs the write side from an
//! interrupt handler and the read side from the USB task. The notify-on-write
//! callback and the `Tail` virtual file below generalize
//! `original_source/src/vd_files_stdout.c`'s single hardcoded `STDOUT.TXT`/
//! `STDOUT-TAIL.TXT` pair to any [`RingBuffer`].

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use spin::Mutex;

use crate::registry::DynamicFileContent;

/// Total bytes ever written, and the buffer contents themselves, wrapped in
/// one lock so a concurrent write can't tear a read.
struct Inner<const N: usize> {
    data: [u8; N],
    /// Total bytes ever appended; `data[tot % N]` is the next write slot.
    total_written: u64,
    /// Installed via [`RingBuffer::set_notify`]; invoked with
    /// `(bytes_written, new_total)` after a write lands, matching
    /// `stdio_ring_buffer_init`'s callback registration.
    notify: Option<fn(u64, u64)>,
}

pub struct RingBuffer<const N: usize> {
    inner: Mutex<Inner<N>>,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: [0u8; N],
                total_written: 0,
                notify: None,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn total_written(&self) -> u64 {
        self.inner.lock().total_written
    }

    /// Installs the callback invoked after every [`Self::write`] call. Only
    /// one callback is ever needed (the original registers exactly one at
    /// init), so a later call simply replaces the earlier one.
    pub fn set_notify(&self, callback: fn(bytes_written: u64, new_total: u64)) {
        self.inner.lock().notify = Some(callback);
    }

    /// Appends `bytes` to the stream, overwriting the oldest bytes still in
    /// the window once the buffer wraps, then invokes the installed notify
    /// callback (if any) with the bytes just written and the new total.
    pub fn write(&self, bytes: &[u8]) {
        let (notify, total_written) = {
            let mut inner = self.inner.lock();
            for &byte in bytes {
                let idx = (inner.total_written % N as u64) as usize;
                inner.data[idx] = byte;
                inner.total_written += 1;
            }
            (inner.notify, inner.total_written)
        };
        if let Some(callback) = notify {
            callback(bytes.len() as u64, total_written);
        }
    }

    /// Fills `dst` with the stream's logical bytes `[offset, offset + dst.len())`.
    /// Positions before the oldest byte still resident in the window, or at or
    /// past `total_written`, read back as zero — mirroring
    /// `stdio_ring_buffer_get_data`'s behavior for a virtual file whose
    /// length is reported as `total_written` but whose backing window is
    /// only `N` bytes deep.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) {
        let inner = self.inner.lock();
        let oldest_available = inner.total_written.saturating_sub(N as u64);
        for (i, slot) in dst.iter_mut().enumerate() {
            let pos = offset + i as u64;
            *slot = if pos < oldest_available || pos >= inner.total_written {
                0
            } else {
                inner.data[(pos % N as u64) as usize]
            };
        }
    }
}

/// Thresholds driving [`TailNotifier`], named after
/// `vd_files_stdout.c`'s `PICOVD_STDOUT_TAIL_UA_*` constants.
#[derive(Debug, Clone, Copy)]
pub struct NotifyPolicy {
    /// Unread bytes must exceed this before any notification is considered
    /// (`PICOVD_STDOUT_TAIL_UA_MINIMUM_AMOUNT`).
    pub minimum_unread_bytes: u64,
    /// A notification fires as soon as `minimum_unread_bytes` is exceeded
    /// and the host hasn't read the tail file in this many seconds
    /// (`PICOVD_STDOUT_TAIL_UA_DELAY_SEC`).
    pub delay_sec: u64,
    /// Otherwise, a notification fires unconditionally once this many
    /// seconds pass with unread bytes still pending
    /// (`PICOVD_STDOUT_TAIL_UA_TIMEOUT_SEC`).
    pub timeout_sec: u64,
    /// The tail window is rounded down to a multiple of this — the USB
    /// transport's endpoint buffer size (`CFG_TUD_MSC_EP_BUFSIZE`).
    pub endpoint_buffer_bytes: u64,
}

/// Drives the "has the host fallen behind on this stream" notification
/// policy from §4.7, and backs the accompanying [`Tail`] virtual file.
/// Generalizes `vd_files_stdout.c`'s free functions
/// (`stdout_notify_write_cb`, `notify_files_changed`, `ua_timeout_cb`) into
/// one reusable type parameterized over a [`NotifyPolicy`] instead of its
/// hardcoded `PICOVD_STDOUT_TAIL_UA_*` macros.
pub struct TailNotifier<'a, const N: usize> {
    stream: &'a RingBuffer<N>,
    policy: NotifyPolicy,
    tail_total_read: AtomicU64,
    last_read_time_sec: AtomicI64,
    window_start: AtomicU64,
    window_size: AtomicU64,
    ua_pending: AtomicBool,
    /// Unix-epoch seconds a timeout notification is due, or `-1` if none is
    /// scheduled. Mirrors the original's one-shot `tail_timeout_alarm`.
    timeout_deadline_sec: AtomicI64,
}

impl<'a, const N: usize> TailNotifier<'a, N> {
    pub const fn new(stream: &'a RingBuffer<N>, policy: NotifyPolicy) -> Self {
        Self {
            stream,
            policy,
            tail_total_read: AtomicU64::new(0),
            last_read_time_sec: AtomicI64::new(0),
            window_start: AtomicU64::new(0),
            window_size: AtomicU64::new(0),
            ua_pending: AtomicBool::new(false),
            timeout_deadline_sec: AtomicI64::new(-1),
        }
    }

    /// Recomputes the tail window against `total_written` and marks a
    /// notification pending, matching `notify_files_changed`. Returns `true`
    /// unconditionally so call sites can `return self.schedule(...)` directly.
    fn schedule(&self, total_written: u64) -> bool {
        let tail_total_read = self.tail_total_read.load(Ordering::Relaxed);
        let unread = total_written.saturating_sub(tail_total_read);
        let rounded = (unread / self.policy.endpoint_buffer_bytes) * self.policy.endpoint_buffer_bytes;
        self.window_start.store(tail_total_read, Ordering::Relaxed);
        self.window_size.store(rounded, Ordering::Relaxed);
        self.ua_pending.store(true, Ordering::Relaxed);
        self.timeout_deadline_sec.store(-1, Ordering::Relaxed);
        true
    }

    /// Call from the ring buffer's write-notify callback. Returns `true` if
    /// the caller should raise a media-change notification now; otherwise a
    /// timeout may have been armed for [`Self::poll_timeout`] to pick up
    /// later. Matches `stdout_notify_write_cb`.
    pub fn on_write(&self, total_written: u64, now_sec: i64) -> bool {
        let tail_total_read = self.tail_total_read.load(Ordering::Relaxed);
        let unread = total_written.saturating_sub(tail_total_read);
        if unread <= self.policy.minimum_unread_bytes {
            return false;
        }

        let last_read = self.last_read_time_sec.load(Ordering::Relaxed);
        let ua_pending = self.ua_pending.load(Ordering::Relaxed);
        if !ua_pending && now_sec.saturating_sub(last_read) >= self.policy.delay_sec as i64 {
            return self.schedule(total_written);
        }

        if self.timeout_deadline_sec.load(Ordering::Relaxed) < 0 {
            self.timeout_deadline_sec
                .store(now_sec.saturating_add(self.policy.timeout_sec as i64), Ordering::Relaxed);
        }
        false
    }

    /// Call periodically (e.g. once per main-loop tick) so a pending
    /// timeout still raises a notification without another write arriving.
    /// Matches `ua_timeout_cb`.
    pub fn poll_timeout(&self, now_sec: i64) -> bool {
        let deadline = self.timeout_deadline_sec.load(Ordering::Relaxed);
        if deadline < 0 || now_sec < deadline {
            return false;
        }
        self.schedule(self.stream.total_written())
    }

    /// Call once the scheduled notification has actually reached the host
    /// (i.e. after the SCSI layer reports the pending Unit Attention), so a
    /// later write can schedule another one instead of finding `ua_pending`
    /// stuck forever.
    pub fn acknowledge(&self) {
        self.ua_pending.store(false, Ordering::Relaxed);
    }

    /// Feeds the `DELAY_SEC` check in [`Self::on_write`]. The caller
    /// supplies `now_sec` from whatever clock source it has, the same way
    /// [`crate::volume::Volume::set_timestamp`] is fed.
    pub fn record_host_read_time(&self, now_sec: i64) {
        self.last_read_time_sec.store(now_sec, Ordering::Relaxed);
    }

    fn advance_tail_read(&self, up_to: u64) {
        let current = self.tail_total_read.load(Ordering::Relaxed);
        if up_to > current {
            self.tail_total_read.store(up_to, Ordering::Relaxed);
        }
    }
}

/// The "tail -F"-style virtual file (§4.7): reads are confined to the
/// current window `[window_start, window_start + window_size)` of the
/// underlying stream and advance `tail_total_read` as they land, matching
/// `stdout_tail_file_content_cb`.
pub struct Tail<'a, const N: usize> {
    pub notifier: &'a TailNotifier<'a, N>,
}

impl<const N: usize> DynamicFileContent for Tail<'_, N> {
    fn len(&self) -> u64 {
        self.notifier.window_size.load(Ordering::Relaxed)
    }

    fn read_at(&self, offset: u64, dst: &mut [u8]) {
        let window_size = self.notifier.window_size.load(Ordering::Relaxed);
        if offset >= window_size {
            dst.fill(0);
            return;
        }
        let to_copy = dst.len().min((window_size - offset) as usize);
        let window_start = self.notifier.window_start.load(Ordering::Relaxed);
        self.notifier
            .stream
            .read_at(window_start + offset, &mut dst[..to_copy]);
        if to_copy < dst.len() {
            dst[to_copy..].fill(0);
        }
        self.notifier.advance_tail_read(window_start + offset + to_copy as u64);
    }
}
