//! Failing elaborations, library errors and partial file-list results.

use strata_conformance::load_fixture;
use strata_diagnostics::{DiagnosticRenderer, TerminalRenderer};
use strata_elaborate::{ElabErrorKind, Elaborator, Stage, TopModRef};
use strata_filelist::FileListResolver;
use strata_library::{load_library_str, LibraryError};

fn elaborate_str(source: &str, top: &str) -> Result<strata_ir::Design, strata_elaborate::ElabError> {
    let (registry, _) = load_library_str(source).unwrap();
    let top: TopModRef = top.parse().unwrap();
    Elaborator::new(&registry).elaborate(&top)
}

const CYCLE: &str = r#"
[library]
name = "loop_lib"

[[modules]]
name = "a"
insts = [{ name = "u_b", module = "loop_lib.b" }]

[[modules]]
name = "b"
insts = [{ name = "u_c", module = "loop_lib.c" }]

[[modules]]
name = "c"
insts = [{ name = "u_a", module = "loop_lib.a" }]
"#;

#[test]
fn cycle_rejection() {
    let err = elaborate_str(CYCLE, "loop_lib.a").unwrap_err();
    assert!(matches!(err.kind, ElabErrorKind::CyclicHierarchy { .. }));
    assert_eq!(err.path.to_string(), "a/u_b/u_c/u_a");
    assert_eq!(
        err.to_string(),
        "a/u_b/u_c/u_a: cyclic hierarchy: loop_lib.a -> loop_lib.b -> loop_lib.c -> loop_lib.a"
    );

    let (registry, _) = load_library_str(CYCLE).unwrap();
    assert!(registry.check_acyclic().is_err());
}

#[test]
fn multiple_drivers() {
    let source = r#"
[library]
name = "lib"

[[modules]]
name = "src"
ports = [{ name = "data_o", type = { kind = "bit" }, direction = "out" }]

[[modules]]
name = "top"
signals = [{ name = "data_s", type = { kind = "bit" } }]
insts = [{ name = "u_src", module = "lib.src" }]
assigns = [
    { target = "data_s", source = "u_src/data_o" },
    { target = "data_s", source = 0 },
]
"#;
    let err = elaborate_str(source, "lib.top").unwrap_err();
    assert_eq!(err.path.to_string(), "top");
    assert!(matches!(err.kind, ElabErrorKind::MultipleDriver { .. }));
    assert_eq!(
        err.kind.to_string(),
        "'data_s' already assigned to 'u_src/data_o', cannot assign '0'"
    );
}

#[test]
fn width_mismatch_is_an_error() {
    let source = r#"
[library]
name = "lib"

[[modules]]
name = "src"
ports = [{ name = "data_o", type = { kind = "uint", width = 8 }, direction = "out" }]

[[modules]]
name = "top"
signals = [{ name = "data_s", type = { kind = "uint", width = 4 } }]
insts = [{ name = "u_src", module = "lib.src" }]
assigns = [{ target = "data_s", source = "u_src/data_o" }]
"#;
    let err = elaborate_str(source, "lib.top").unwrap_err();
    assert!(matches!(err.kind, ElabErrorKind::TypeMismatch { .. }));
}

#[test]
fn unresolved_type_parameter() {
    let source = r#"
[library]
name = "lib"

[[modules]]
name = "top"
ports = [{ name = "data_i", type = { kind = "uint", width = "depth_p" }, direction = "in" }]
"#;
    let err = elaborate_str(source, "lib.top").unwrap_err();
    assert_eq!(err.stage, Stage::ParametersBound);
    assert!(err.to_string().contains("depth_p"));
}

#[test]
fn evaluation_error_in_override() {
    let source = r#"
[library]
name = "lib"

[[modules]]
name = "leaf"
params = [{ name = "width_p", type = { kind = "integer", default = 1 } }]

[[modules]]
name = "top"
params = [{ name = "zero_p", type = { kind = "integer" } }]
insts = [{ name = "u_leaf", module = "lib.leaf", params = { width_p = "8 / zero_p" } }]
"#;
    let err = elaborate_str(source, "lib.top").unwrap_err();
    assert!(err.path.to_string().starts_with("top"));
    assert!(err.to_string().contains("division by zero"), "{err}");
}

#[test]
fn diagnostics_carry_the_path() {
    let err = elaborate_str(CYCLE, "loop_lib.a").unwrap_err();
    let text = TerminalRenderer::new(false).render(&err.to_diagnostic());
    let code = err.code().to_string();
    assert!(text.starts_with(&format!("error[{code}]: cyclic hierarchy")));
    assert!(text.contains("  --> a/u_b/u_c/u_a\n"));
}

#[test]
fn library_errors() {
    let unknown = r#"
[library]
name = "lib"

[[modules]]
name = "top"
ports = [{ name = "bus_i", type = { kind = "ref", name = "other_lib.BusType" }, direction = "in" }]
"#;
    let err = load_library_str(unknown).unwrap_err();
    assert!(matches!(err, LibraryError::UnknownType { .. }));

    let duplicate = r#"
[library]
name = "lib"

[[modules]]
name = "top"
signals = [
    { name = "data_s", type = { kind = "bit" } },
    { name = "data_s", type = { kind = "bit" } },
]
"#;
    let err = load_library_str(duplicate).unwrap_err();
    assert!(matches!(err, LibraryError::Definition { .. }));

    let bad_expr = r#"
[library]
name = "lib"

[[modules]]
name = "top"
params = [{ name = "width_p", type = { kind = "integer", default = "log2ceil(" } }]
"#;
    let err = load_library_str(bad_expr).unwrap_err();
    assert!(matches!(err, LibraryError::Expr { .. }));
}

#[test]
fn missing_template_is_collected() {
    let fixture = load_fixture("uart").unwrap();
    let design = fixture.elaborate(None).unwrap();

    let mut options = fixture.filelist_options();
    options.template_paths.clear();
    let report = FileListResolver::new(&fixture.registry, options).collect(&design);

    let failed: Vec<String> = report.failures.iter().map(|f| f.path.to_string()).collect();
    assert_eq!(failed, vec!["uart/u_clk_gate", "uart/u_regf"]);
    let resolved: Vec<String> = report.entries.iter().map(|e| e.path.to_string()).collect();
    assert_eq!(resolved, vec!["uart/u_core", "uart"]);

    let diagnostics = report.diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].code.to_string(), "E301");
    assert_eq!(
        diagnostics[0].path.as_ref().map(ToString::to_string).as_deref(),
        Some("uart/u_clk_gate")
    );
}

const SELECT: &str = r#"
[library]
name = "sel_lib"

[[modules]]
name = "src"
ports = [{ name = "data_o", type = { kind = "uint", width = 8 }, direction = "out" }]

[[modules]]
name = "top"
ports = [
    { name = "sel_i", type = { kind = "uint", width = 2 }, direction = "in" },
    { name = "q_o", type = { kind = "uint", width = 8 }, direction = "out" },
    { name = "nib_o", type = { kind = "uint", width = 4 }, direction = "out" },
]
insts = [{ name = "u_src", module = "sel_lib.src" }]
assigns = [{ target = "nib_o", source = "u_src/data_o[SLICE]" }]

[[modules.muxes]]
name = "main"
defaults = [{ target = "q_o", source = 0 }]
cases = [{ sel = "sel_i", cond = COND, target = "q_o", source = "u_src/data_o" }]
"#;

fn select_source(slice: &str, cond: i64) -> String {
    SELECT
        .replace("SLICE", slice)
        .replace("COND", &cond.to_string())
}

#[test]
fn slices_and_muxes_elaborate() {
    let design = elaborate_str(&select_source("7:4", 3), "sel_lib.top").unwrap();
    let conns: Vec<String> = design.top.connections.iter().map(ToString::to_string).collect();
    assert_eq!(
        conns,
        vec![
            "nib_o <= u_src/data_o[7:4]",
            "q_o <= 0 [main: default]",
            "q_o <= u_src/data_o [main: sel_i == 3]",
        ]
    );
}

#[test]
fn slice_outside_vector() {
    let err = elaborate_str(&select_source("9:6", 1), "sel_lib.top").unwrap_err();
    assert_eq!(err.code().to_string(), "E216");
    assert_eq!(err.path.to_string(), "top");
    assert_eq!(err.stage, Stage::ParametersBound);

    let err = elaborate_str(&select_source("4:0", 1), "sel_lib.top").unwrap_err();
    assert_eq!(err.code().to_string(), "E205");
}

#[test]
fn mux_condition_outside_select() {
    let err = elaborate_str(&select_source("3:0", 4), "sel_lib.top").unwrap_err();
    assert_eq!(err.code().to_string(), "E217");
    assert_eq!(
        err.to_string(),
        "top: invalid mux 'main': condition 4 does not fit select 'sel_i' of UintType(2)"
    );
}

#[test]
fn undriven_inputs_are_warnings() {
    let fixture = load_fixture("uart").unwrap();
    let design = fixture.elaborate(None).unwrap();
    let sink = strata_diagnostics::DiagnosticSink::new();
    strata_elaborate::lint_design(&design, &sink);
    assert!(sink.diagnostics().is_empty());

    let source = r#"
[library]
name = "lib"

[[modules]]
name = "leaf"
ports = [
    { name = "en_i", type = { kind = "bit" }, direction = "in" },
    { name = "data_i", type = { kind = "uint", width = 8 }, direction = "in" },
]

[[modules]]
name = "top"
insts = [{ name = "u_leaf", module = "lib.leaf" }]
assigns = [{ target = "u_leaf/data_i[3:0]", source = 0 }]
"#;
    let design = elaborate_str(source, "lib.top").unwrap();
    let sink = strata_diagnostics::DiagnosticSink::new();
    strata_elaborate::lint_design(&design, &sink);
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.to_string(), "W200");
    assert_eq!(diagnostics[0].message, "input 'u_leaf/en_i' is not driven");
    assert!(!sink.has_errors());
    let summary = TerminalRenderer::new(false).render_summary(&sink.by_instance());
    assert_eq!(summary, "  top: 1 warning\n");
}
