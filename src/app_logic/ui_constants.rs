/*
 * Defines shared constants for the application logic: the application name
 * used for directories and window classes, the log file name, and the
 * external pages the flyout links to.
 */

pub const APP_NAME: &str = "tintbar";

pub const LOG_FILE_NAME: &str = "tintbar.log";

pub const TIPS_AND_TRICKS_URI: &str = "https://github.com/tintbar/tintbar/wiki/Tips-and-tricks";

pub const ABOUT_URI: &str = "https://github.com/tintbar/tintbar#readme";
