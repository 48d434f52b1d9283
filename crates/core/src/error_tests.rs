// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn exec_error_exit_code_passes_through() {
    let err = AtkinsError::Exec(ExecError::new("boom").with_exit_code(3));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn exec_error_without_code_defaults_to_one() {
    let err = AtkinsError::Exec(ExecError::new("boom"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn non_exec_errors_are_generic_failures() {
    let err = AtkinsError::Resolution(ResolutionError::JobNotFound("x".into()));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_requirements_message_matches_expected_format() {
    let err = ResolutionError::MissingRequirements {
        job: "deploy".into(),
        required: vec!["TOKEN".into()],
        missing: vec!["TOKEN".into()],
    };
    assert_eq!(
        err.to_string(),
        "job 'deploy' requires variables [\"TOKEN\"] but missing: [\"TOKEN\"]"
    );
}

#[test]
fn interpolation_surface_displays_human_readable_text() {
    let surface = InterpolationSurface::StepVar("name".into());
    assert_eq!(surface.to_string(), "step var `name`");
}
