//! Process exit codes reported by the L2T STARS product generator

pub const SUCCESS: i32 = 0;
pub const UNCLASSIFIED_FAILURE_EXIT_CODE: i32 = 1;
pub const RUNCONFIG_FILENAME_NOT_SUPPLIED: i32 = 6;
pub const MISSING_RUNCONFIG_FILE: i32 = 7;
pub const UNABLE_TO_PARSE_RUNCONFIG: i32 = 8;
pub const MISSING_RUNCONFIG_FIELD: i32 = 9;
pub const INPUT_FILES_INACCESSIBLE: i32 = 11;
pub const BLANK_OUTPUT: i32 = 13;
pub const LAND_FILTER: i32 = 14;
pub const DATA_FUSION_FAILED: i32 = 15;

/// Short label for an exit code, used in the final log line
pub fn describe(code: i32) -> &'static str {
    match code {
        SUCCESS => "success",
        UNCLASSIFIED_FAILURE_EXIT_CODE => "unclassified failure",
        RUNCONFIG_FILENAME_NOT_SUPPLIED => "run-config filename not supplied",
        MISSING_RUNCONFIG_FILE => "missing run-config file",
        UNABLE_TO_PARSE_RUNCONFIG => "unable to parse run-config",
        MISSING_RUNCONFIG_FIELD => "missing run-config field",
        INPUT_FILES_INACCESSIBLE => "input files inaccessible",
        BLANK_OUTPUT => "blank output",
        LAND_FILTER => "tile filtered out over water",
        DATA_FUSION_FAILED => "data fusion failed",
        _ => "unknown exit code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            SUCCESS,
            UNCLASSIFIED_FAILURE_EXIT_CODE,
            RUNCONFIG_FILENAME_NOT_SUPPLIED,
            MISSING_RUNCONFIG_FILE,
            UNABLE_TO_PARSE_RUNCONFIG,
            MISSING_RUNCONFIG_FIELD,
            INPUT_FILES_INACCESSIBLE,
            BLANK_OUTPUT,
            LAND_FILTER,
            DATA_FUSION_FAILED,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(describe(SUCCESS), "success");
    }
}
