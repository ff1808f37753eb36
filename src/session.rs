//! Windows real-time session adapter.
//!
//! Opens an existing real-time logger session by name and runs
//! `ProcessTrace` on it, turning the two C callbacks into calls on an
//! [`EventCallbacks`]. This module is the only place that dereferences the
//! opaque context pointer or the raw payload pointer ETW hands out; the
//! payload is wrapped into a slice once, here, before any decoder sees it.
//!
//! Session configuration (which providers are enabled, buffer sizes, the
//! clock) belongs to whoever started the session. Events must carry QPC
//! timestamps for the tick conversion to be meaningful.

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

use anyhow::{bail, Result};
use windows_sys::Win32::Foundation::{ERROR_CANCELLED, ERROR_SUCCESS};
use windows_sys::Win32::System::Diagnostics::Etw::{
    CloseTrace, OpenTraceW, ProcessTrace, EVENT_RECORD, EVENT_TRACE_LOGFILEW,
    PROCESSTRACE_HANDLE, PROCESS_TRACE_MODE_EVENT_RECORD, PROCESS_TRACE_MODE_RAW_TIMESTAMP,
    PROCESS_TRACE_MODE_REAL_TIME,
};

use crate::guid::Guid;
use crate::record::{BufferContext, EventDescriptor, EventHeader, EventRecord};
use crate::source::{EventCallbacks, EventSource};

// OpenTraceW's failure value is the all-ones handle of the platform width.
fn is_invalid_handle(handle: u64) -> bool {
    handle == u64::MAX || handle == u32::MAX as u64
}

/// Closes a session from any thread, which makes a blocked `ProcessTrace`
/// return.
#[derive(Debug, Clone, Copy)]
pub struct SessionCloser {
    handle: u64,
}

impl SessionCloser {
    pub fn close(&self) {
        // SAFETY: closing an already closed handle is reported as an error,
        // not undefined behavior.
        let status = unsafe { CloseTrace(PROCESSTRACE_HANDLE { Value: self.handle }) };
        if status != ERROR_SUCCESS {
            log::debug!("CloseTrace returned {status}");
        }
    }
}

pub struct RealtimeSession {
    name: String,
    handle: u64,
    // Context pointer registered with ETW. Holds a `*mut &mut dyn
    // EventCallbacks` while `pump` runs and null otherwise. Boxed so its
    // address survives moves of the session.
    slot: Box<Cell<*mut c_void>>,
    closed: bool,
}

impl RealtimeSession {
    pub fn open(name: &str) -> Result<Self> {
        let mut wide_name: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let slot: Box<Cell<*mut c_void>> = Box::new(Cell::new(ptr::null_mut()));

        // SAFETY: EVENT_TRACE_LOGFILEW is plain data; all-zero is its
        // documented "unset" state.
        let mut logfile: EVENT_TRACE_LOGFILEW = unsafe { std::mem::zeroed() };
        logfile.LoggerName = wide_name.as_mut_ptr();
        logfile.Anonymous1.ProcessTraceMode = PROCESS_TRACE_MODE_REAL_TIME
            | PROCESS_TRACE_MODE_EVENT_RECORD
            | PROCESS_TRACE_MODE_RAW_TIMESTAMP;
        logfile.BufferCallback = Some(buffer_callback);
        logfile.Anonymous2.EventRecordCallback = Some(event_record_callback);
        logfile.Context = &*slot as *const Cell<*mut c_void> as *mut c_void;

        // SAFETY: `logfile` and `wide_name` are valid for the duration of
        // the call; the context pointer outlives the trace handle.
        let handle = unsafe { OpenTraceW(&mut logfile) };
        if is_invalid_handle(handle.Value) {
            bail!(
                "Failed to open ETW session {name}: {}",
                std::io::Error::last_os_error()
            );
        }
        log::debug!("Opened ETW real-time session {name}");

        Ok(Self {
            name: name.to_string(),
            handle: handle.Value,
            slot,
            closed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            handle: self.handle,
        }
    }
}

impl EventSource for RealtimeSession {
    fn pump(&mut self, callbacks: &mut dyn EventCallbacks) -> Result<()> {
        if self.closed {
            bail!("ETW session {} already consumed", self.name);
        }

        let mut callbacks: &mut dyn EventCallbacks = callbacks;
        self.slot
            .set(&mut callbacks as *mut &mut dyn EventCallbacks as *mut c_void);

        let handles = [PROCESSTRACE_HANDLE { Value: self.handle }];
        // SAFETY: the slot points at `callbacks`, which lives until after
        // ProcessTrace returns and the slot is cleared.
        let status =
            unsafe { ProcessTrace(handles.as_ptr(), 1, ptr::null(), ptr::null()) };
        self.slot.set(ptr::null_mut());

        self.closer().close();
        self.closed = true;

        match status {
            ERROR_SUCCESS | ERROR_CANCELLED => Ok(()),
            err => bail!(
                "ProcessTrace on {} failed: {}",
                self.name,
                std::io::Error::from_raw_os_error(err as i32)
            ),
        }
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        if !self.closed {
            self.closer().close();
        }
    }
}

/// Resolves a context pointer registered by [`RealtimeSession::open`] to
/// the callbacks of the running `pump`, if any.
///
/// # Safety
///
/// `context` must be null or the slot pointer of a live session.
unsafe fn callbacks_from_context<'a>(
    context: *mut c_void,
) -> Option<&'a mut &'a mut dyn EventCallbacks> {
    if context.is_null() {
        return None;
    }
    let slot = &*(context as *const Cell<*mut c_void>);
    let callbacks = slot.get();
    if callbacks.is_null() {
        return None;
    }
    Some(&mut *(callbacks as *mut &mut dyn EventCallbacks))
}

unsafe extern "system" fn event_record_callback(event_record: *mut EVENT_RECORD) {
    let Some(event_record) = event_record.as_ref() else {
        return;
    };
    let Some(callbacks) = callbacks_from_context(event_record.UserContext) else {
        return;
    };

    let payload: &[u8] = if event_record.UserData.is_null() || event_record.UserDataLength == 0 {
        &[]
    } else {
        // SAFETY: ETW guarantees UserData points at UserDataLength bytes for
        // the duration of the callback.
        std::slice::from_raw_parts(
            event_record.UserData as *const u8,
            event_record.UserDataLength as usize,
        )
    };

    let header = &event_record.EventHeader;
    let provider = header.ProviderId;
    let record = EventRecord {
        header: EventHeader {
            provider_id: Guid::from_fields(
                provider.data1,
                provider.data2,
                provider.data3,
                provider.data4,
            ),
            descriptor: EventDescriptor {
                version: header.EventDescriptor.Version,
                opcode: header.EventDescriptor.Opcode,
            },
            timestamp_ticks: header.TimeStamp,
        },
        buffer_context: BufferContext {
            processor_index: event_record.BufferContext.Anonymous.ProcessorIndex,
            logger_id: event_record.BufferContext.LoggerId,
        },
        payload,
    };
    callbacks.on_event(&record);
}

unsafe extern "system" fn buffer_callback(logfile: *mut EVENT_TRACE_LOGFILEW) -> u32 {
    let Some(logfile) = logfile.as_ref() else {
        return 1;
    };
    match callbacks_from_context(logfile.Context) {
        Some(callbacks) => callbacks.on_buffer() as u32,
        None => 1,
    }
}
