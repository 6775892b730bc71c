//! FFI bindings for Synheart HRV
//!
//! This module provides C-compatible functions for calling the analyzer from
//! other languages. Readings are passed as JSON (array or NDJSON) C strings and
//! reports come back as JSON. Returned strings are allocated and must be freed
//! by the caller using `hrv_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::Utc;

use crate::config::{AnalyzerConfig, RangeKind};
use crate::error::ComputeError;
use crate::pipeline::{
    readings_to_date_range_report, readings_to_day_report, readings_to_range_report, HrvAnalyzer,
};
use crate::report::to_json;
use crate::source::{parse_readings, InMemorySampleSource};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Hand a JSON result to the caller, or record the error and return NULL
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze readings over a lookback range ending now and return a range
/// report as JSON.
///
/// # Safety
/// - `readings`, `range`, and `timezone` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `hrv_free_string`.
/// - Returns NULL on error; call `hrv_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hrv_analyze_range(
    readings: *const c_char,
    range: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(readings) = required_arg(readings, "readings") else {
        return ptr::null_mut();
    };
    let Some(range) = required_arg(range, "range") else {
        return ptr::null_mut();
    };
    let Some(timezone) = required_arg(timezone, "timezone") else {
        return ptr::null_mut();
    };

    finish(
        AnalyzerConfig::with_timezone(&timezone)
            .and_then(|config| readings_to_range_report(&readings, &range, config, Utc::now()))
            .and_then(|report| to_json(&report)),
    )
}

/// Analyze one local calendar day (`YYYY-MM-DD`) and return an hourly day
/// report as JSON.
///
/// # Safety
/// - `readings`, `date`, and `timezone` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `hrv_free_string`.
/// - Returns NULL on error; call `hrv_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hrv_analyze_day(
    readings: *const c_char,
    date: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(readings) = required_arg(readings, "readings") else {
        return ptr::null_mut();
    };
    let Some(date) = required_arg(date, "date") else {
        return ptr::null_mut();
    };
    let Some(timezone) = required_arg(timezone, "timezone") else {
        return ptr::null_mut();
    };

    finish(
        AnalyzerConfig::with_timezone(&timezone)
            .and_then(|config| readings_to_day_report(&readings, &date, config))
            .and_then(|report| to_json(&report)),
    )
}

/// Analyze an inclusive date range and return per-day hourly reports as JSON.
///
/// # Safety
/// - All arguments must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `hrv_free_string`.
/// - Returns NULL on error; call `hrv_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hrv_analyze_date_range(
    readings: *const c_char,
    start_date: *const c_char,
    end_date: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(readings) = required_arg(readings, "readings") else {
        return ptr::null_mut();
    };
    let Some(start_date) = required_arg(start_date, "start_date") else {
        return ptr::null_mut();
    };
    let Some(end_date) = required_arg(end_date, "end_date") else {
        return ptr::null_mut();
    };
    let Some(timezone) = required_arg(timezone, "timezone") else {
        return ptr::null_mut();
    };

    finish(
        AnalyzerConfig::with_timezone(&timezone)
            .and_then(|config| {
                readings_to_date_range_report(&readings, &start_date, &end_date, config)
            })
            .and_then(|report| to_json(&report)),
    )
}

// ============================================================================
// Analyzer Handle API
// ============================================================================

/// Opaque handle to an HrvAnalyzer
pub struct HrvAnalyzerHandle {
    analyzer: HrvAnalyzer,
}

/// Create an analyzer from a JSON configuration (NULL for defaults).
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `hrv_analyzer_free`.
/// - Returns NULL on error; call `hrv_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hrv_analyzer_new(config_json: *const c_char) -> *mut HrvAnalyzerHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        Some(json) => AnalyzerConfig::from_json(&json),
        None => Ok(AnalyzerConfig::default()),
    };

    match config.and_then(HrvAnalyzer::with_config) {
        Ok(analyzer) => Box::into_raw(Box::new(HrvAnalyzerHandle { analyzer })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `hrv_analyzer_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn hrv_analyzer_free(analyzer: *mut HrvAnalyzerHandle) {
    if !analyzer.is_null() {
        drop(Box::from_raw(analyzer));
    }
}

/// Produce a range report for `user_id` with a configured analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `hrv_analyzer_new`.
/// - `readings`, `user_id`, and `range` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `hrv_free_string`.
/// - Returns NULL on error; call `hrv_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn hrv_analyzer_range_report(
    analyzer: *const HrvAnalyzerHandle,
    readings: *const c_char,
    user_id: *const c_char,
    range: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }
    let handle = &*analyzer;

    let Some(readings) = required_arg(readings, "readings") else {
        return ptr::null_mut();
    };
    let Some(user_id) = required_arg(user_id, "user_id") else {
        return ptr::null_mut();
    };
    let Some(range) = required_arg(range, "range") else {
        return ptr::null_mut();
    };

    let result = range.parse::<RangeKind>().and_then(|range| {
        let source = InMemorySampleSource::new().with_readings(&user_id, parse_readings(&readings)?);
        handle
            .analyzer
            .range_report(&source, &user_id, range, Utc::now())
    });
    finish(result.and_then(|report| to_json(&report)))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by HRV functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an HRV function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn hrv_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next HRV function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn hrv_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn hrv_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HeartRateReading;
    use chrono::{Duration, TimeZone};
    use std::ffi::CString;

    /// One hour of per-minute readings ending two hours before now
    fn recent_readings_json() -> CString {
        let start = Utc::now() - Duration::hours(3);
        let readings: Vec<HeartRateReading> = (0..60)
            .map(|i| {
                HeartRateReading::new(
                    (start + Duration::minutes(i)).fixed_offset(),
                    68.0 + [0.0, 3.0, -2.0, 4.0, -3.0][(i % 5) as usize],
                )
            })
            .collect();
        CString::new(serde_json::to_string(&readings).unwrap()).unwrap()
    }

    fn day_readings_json() -> CString {
        let start = chrono::FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 9, 0, 0)
            .unwrap();
        let lines: Vec<String> = (0..30)
            .map(|i| {
                let reading = HeartRateReading::new(
                    start + Duration::minutes(i),
                    70.0 + f64::from((i % 4) as u32),
                );
                serde_json::to_string(&reading).unwrap()
            })
            .collect();
        CString::new(lines.join("\n")).unwrap()
    }

    #[test]
    fn test_ffi_analyze_range() {
        let readings = recent_readings_json();
        let range = CString::new("1d").unwrap();
        let tz = CString::new("UTC").unwrap();

        unsafe {
            let result = hrv_analyze_range(readings.as_ptr(), range.as_ptr(), tz.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"time_series\""));
            assert!(!result_str.contains("\"patterns\""));

            hrv_free_string(result);
        }
    }

    #[test]
    fn test_ffi_analyze_day() {
        let readings = day_readings_json();
        let date = CString::new("2024-01-15").unwrap();
        let tz = CString::new("America/New_York").unwrap();

        unsafe {
            let result = hrv_analyze_day(readings.as_ptr(), date.as_ptr(), tz.as_ptr());
            assert!(!result.is_null());

            let report: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(report["hours_available"], 1);
            assert_eq!(report["hourly"][0]["hour"], 9);

            hrv_free_string(result);
        }
    }

    #[test]
    fn test_ffi_analyzer_lifecycle() {
        unsafe {
            let config = CString::new(r#"{"timezone": "UTC", "window_minutes": 5}"#).unwrap();
            let analyzer = hrv_analyzer_new(config.as_ptr());
            assert!(!analyzer.is_null());

            let readings = recent_readings_json();
            let user = CString::new("user-1").unwrap();
            let range = CString::new("7d").unwrap();

            let result = hrv_analyzer_range_report(
                analyzer,
                readings.as_ptr(),
                user.as_ptr(),
                range.as_ptr(),
            );
            assert!(!result.is_null());

            let report: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(report["user_id"], "user-1");
            assert!(report.get("patterns").is_some());

            hrv_free_string(result);
            hrv_analyzer_free(analyzer);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid = CString::new("not json").unwrap();
            let range = CString::new("1d").unwrap();
            let tz = CString::new("UTC").unwrap();

            let result = hrv_analyze_range(invalid.as_ptr(), range.as_ptr(), tz.as_ptr());
            assert!(result.is_null());

            let error = hrv_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let bad_tz = CString::new("Mars/Olympus").unwrap();
            let readings = recent_readings_json();
            let result = hrv_analyze_range(readings.as_ptr(), range.as_ptr(), bad_tz.as_ptr());
            assert!(result.is_null());
            let error_str = CStr::from_ptr(hrv_last_error()).to_str().unwrap();
            assert!(error_str.contains("timezone"));
        }
    }

    #[test]
    fn test_ffi_null_arguments() {
        unsafe {
            let range = CString::new("1d").unwrap();
            let result = hrv_analyze_range(ptr::null(), range.as_ptr(), ptr::null());
            assert!(result.is_null());
            let error_str = CStr::from_ptr(hrv_last_error()).to_str().unwrap();
            assert!(error_str.contains("readings"));

            hrv_free_string(ptr::null_mut());
            hrv_analyzer_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = hrv_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
