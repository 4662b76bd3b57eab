/// Counter for files whose lines were fully loaded and routed
pub const FILES_PROCESSED_COUNTER: &str = "file_shipper_files_processed_total";

/// Counter for files abandoned because they could not be read
pub const FILES_FAILED_COUNTER: &str = "file_shipper_files_failed_total";

/// Counter for lines handed to the publisher
pub const LINES_PUBLISHED_COUNTER: &str = "file_shipper_lines_published_total";

/// Counter for lines sent to a fallback file, labelled by `reason`
pub const LINES_FALLBACK_COUNTER: &str = "file_shipper_lines_fallback_total";

/// Counter for lines rejected by the line filter
pub const LINES_FILTERED_COUNTER: &str = "file_shipper_lines_filtered_total";

/// Counter for fallback files opened
pub const FALLBACK_STREAMS_COUNTER: &str = "file_shipper_fallback_streams_total";

/// Counter for fallback lines that only made it into the logs
pub const FALLBACK_WRITE_ERRORS_COUNTER: &str = "file_shipper_fallback_write_errors_total";
