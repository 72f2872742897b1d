//! Named special cases applied while merging action files.
//!
//! Both rules key off the textual form of a tool's command line. They exist to
//! work around specific behaviour of the MSVC toolchain and are kept here,
//! isolated from the merge logic, so their trigger conditions can be tested
//! directly.

use super::model::Tool;
use crate::error::{MeldError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Dedup key prefix for tools that create a shared editor precompiled header.
pub const SHARED_PCH_KEY_PREFIX: &str = "SharedEditorPCH$ ";

/// Directory segment that marks a precompiled header as shared between modules.
pub const SHARED_PCH_DIR_SEGMENT: &str = "SharedPCHs";

/// Directory segment of the editor target's intermediate tree.
pub const EDITOR_TARGET_DIR_SEGMENT: &str = "UE4Editor";

/// Output mask of the resource compiler step whose output directory is created eagerly.
pub const LEGACY_RESOURCE_OUTPUT_MASK: &str = "PCLaunch.rc.res";

/// ` /Fp"<path>"`, the precompiled header output switch.
static PCH_OUTPUT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#" /Fp"([^"]*)""#).expect("Invalid PCH output regex"));

/// `/fo "<path>"`, the resource compiler output switch.
static RESOURCE_OUTPUT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"/fo "([^"]+)""#).expect("Invalid resource output regex"));

/// Returns the PCH path when `params` create a shared editor precompiled header.
///
/// Triggers only when a ` /Yc"` switch is present and a ` /Fp"..."` switch
/// after it names a path under both a `SharedPCHs` and a `UE4Editor`
/// directory. Either path separator is accepted.
pub fn shared_pch_output(params: &str) -> Option<&str> {
    let create_at = params.find(" /Yc\"")?;
    let caps = PCH_OUTPUT_REGEX.captures(&params[create_at..])?;
    let path = caps.get(1)?.as_str();
    is_shared_pch_path(path).then_some(path)
}

/// True if `path` has both a `SharedPCHs` and a `UE4Editor` directory segment.
pub fn is_shared_pch_path(path: &str) -> bool {
    let normalized = path.replace('/', "\\");
    let has_segment = |segment: &str| normalized.contains(&format!("\\{}\\", segment));
    has_segment(SHARED_PCH_DIR_SEGMENT) && has_segment(EDITOR_TARGET_DIR_SEGMENT)
}

/// The key under which identical tools collapse into one.
///
/// Normally `path + " " + params`. Tools creating a shared editor PCH key on
/// the PCH path alone, since each requesting target passes slightly different
/// params for what is the same output. The path is keyed with `\`
/// separators so both spellings of one PCH collapse.
pub fn tool_dedup_key(tool: &Tool) -> String {
    match shared_pch_output(&tool.params) {
        Some(pch) => format!("{}{}", SHARED_PCH_KEY_PREFIX, pch.replace('/', "\\")),
        None => tool.signature(),
    }
}

/// Directory the legacy resource compiler step writes into, if this tool is that step.
pub fn legacy_resource_output_dir(tool: &Tool) -> Option<PathBuf> {
    if tool.output_file_masks != LEGACY_RESOURCE_OUTPUT_MASK {
        return None;
    }
    let caps = RESOURCE_OUTPUT_REGEX.captures(&tool.params)?;
    let raw = caps.get(1)?.as_str();
    let output = PathBuf::from(native_separators(raw));
    output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Create the legacy resource output directory on clean builds, where it is missing.
pub fn ensure_legacy_resource_output_dir(tool: &Tool) -> Result<Option<PathBuf>> {
    let Some(dir) = legacy_resource_output_dir(tool) else {
        return Ok(None);
    };
    if !dir.is_dir() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            MeldError::UserError(format!(
                "failed to create resource output directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }
    Ok(Some(dir))
}

#[cfg(windows)]
fn native_separators(path: &str) -> String {
    path.to_string()
}

#[cfg(not(windows))]
fn native_separators(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHARED_PCH: &str =
        r"D:\Build\Engine\Intermediate\Build\Win64\UE4Editor\Development\SharedPCHs\CoreUObject.h.pch";

    fn pch_params(pch: &str) -> String {
        format!(r#"/c /Yc"SharedPCH.h" /Fp"{}" /FoCore.obj"#, pch)
    }

    #[test]
    fn shared_pch_detected_when_all_conditions_hold() {
        assert_eq!(shared_pch_output(&pch_params(SHARED_PCH)), Some(SHARED_PCH));
    }

    #[test]
    fn shared_pch_requires_create_switch() {
        let params = format!(r#"/c /Yu"SharedPCH.h" /Fp"{}""#, SHARED_PCH);
        assert_eq!(shared_pch_output(&params), None);
    }

    #[test]
    fn shared_pch_requires_fp_after_yc() {
        let params = format!(r#"/c /Fp"{}" /Yc"SharedPCH.h""#, SHARED_PCH);
        assert_eq!(shared_pch_output(&params), None);
    }

    #[test]
    fn shared_pch_requires_both_segments() {
        let not_shared = r"D:\Build\Win64\UE4Editor\Development\Core\Core.h.pch";
        let not_editor = r"D:\Build\Win64\Game\Development\SharedPCHs\Core.h.pch";
        assert_eq!(shared_pch_output(&pch_params(not_shared)), None);
        assert_eq!(shared_pch_output(&pch_params(not_editor)), None);
    }

    #[test]
    fn shared_pch_segment_must_be_whole_directory() {
        let partial = r"D:\Build\MyUE4Editor\SharedPCHsOld\Core.h.pch";
        assert!(!is_shared_pch_path(partial));
        assert!(is_shared_pch_path("/b/UE4Editor/Development/SharedPCHs/Core.h.pch"));
    }

    #[test]
    fn dedup_key_uses_pch_path_for_shared_pch() {
        let a = Tool::new("Tool0", "cl.exe", pch_params(SHARED_PCH));
        let mut b = a.clone();
        b.params = format!("{} /DTARGET=Other", b.params);

        assert_eq!(tool_dedup_key(&a), format!("SharedEditorPCH$ {}", SHARED_PCH));
        assert_eq!(tool_dedup_key(&a), tool_dedup_key(&b));
    }

    #[test]
    fn dedup_key_ignores_pch_path_separator_style() {
        let forward = SHARED_PCH.replace('\\', "/");
        let backslash = Tool::new("Tool0", "cl.exe", pch_params(SHARED_PCH));
        let mixed = Tool::new("Tool1", "cl.exe", format!("/DGAME=1 {}", pch_params(&forward)));

        assert_eq!(tool_dedup_key(&backslash), tool_dedup_key(&mixed));
        assert_eq!(
            tool_dedup_key(&mixed),
            format!("{}{}", SHARED_PCH_KEY_PREFIX, SHARED_PCH)
        );
    }

    #[test]
    fn dedup_key_defaults_to_signature() {
        let tool = Tool::new("Tool0", "cl.exe", "/c a.cpp");
        assert_eq!(tool_dedup_key(&tool), "cl.exe /c a.cpp");
    }

    #[test]
    fn legacy_resource_requires_exact_mask() {
        let mut tool = Tool::new("Tool0", "rc.exe", r#"/fo "out/Res/PCLaunch.rc.res" PCLaunch.rc"#);
        tool.output_file_masks = "Other.rc.res".to_string();
        assert_eq!(legacy_resource_output_dir(&tool), None);

        tool.output_file_masks = LEGACY_RESOURCE_OUTPUT_MASK.to_string();
        assert_eq!(legacy_resource_output_dir(&tool), Some(PathBuf::from("out/Res")));
    }

    #[test]
    fn legacy_resource_without_fo_switch_is_ignored() {
        let mut tool = Tool::new("Tool0", "rc.exe", "PCLaunch.rc");
        tool.output_file_masks = LEGACY_RESOURCE_OUTPUT_MASK.to_string();
        assert_eq!(legacy_resource_output_dir(&tool), None);
    }

    #[test]
    fn ensure_legacy_resource_dir_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("Intermediate").join("Res");
        let mut tool = Tool::new(
            "Tool0",
            "rc.exe",
            format!(r#"/fo "{}" PCLaunch.rc"#, out.join("PCLaunch.rc.res").display()),
        );
        tool.output_file_masks = LEGACY_RESOURCE_OUTPUT_MASK.to_string();

        let created = ensure_legacy_resource_output_dir(&tool).unwrap();

        assert_eq!(created, Some(out.clone()));
        assert!(out.is_dir());
    }
}
