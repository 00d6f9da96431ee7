//! End-to-end tests for module tables: fill, ordering, persistence.

mod common;

use common::{stub_reader, BuildDir};
use fwmodules::{
    Address, ErrorKind, Module, ModuleConfig, ModuleError, ModuleTable, ObjectArtifactReader,
    RenderOptions, TableConfig,
};
use std::collections::BTreeSet;

const SECTIONS: &[(&str, u64, u64)] = &[("A", 0x10, 0x100), ("B", 0x20, 0x50)];

/// Every module's code section starts at its image base and spans 0x100.
const AT_BASE: &[(&str, u64, u64)] = &[("A", 0, 0x100), ("B", 0, 0x100), ("C", 0, 0x100)];

fn strict_table(modules: impl IntoIterator<Item = Module>) -> ModuleTable {
    let mut table = ModuleTable::with_config(TableConfig {
        strict_overlap: true,
        ..TableConfig::default()
    });
    for module in modules {
        table.add_module(module).unwrap();
    }
    table
}

#[test]
fn test_fill_two_modules() {
    let build = BuildDir::new();
    let mut table = ModuleTable::from_modules([
        build.placeholder_module("B", 0x2000),
        build.placeholder_module("A", 0x1000),
    ])
    .unwrap();

    let report = table.fill_all_text_info(&stub_reader(SECTIONS));
    assert!(report.is_success(), "{report}");

    let rendered = table.render_short();
    assert_eq!(
        rendered,
        vec!["A 0x1000 0x1010-0x1110", "B 0x2000 0x2020-0x2070"]
    );
}

#[test]
fn test_fill_parallel_matches_sequential() {
    let build = BuildDir::new();
    let modules = [
        build.placeholder_module("A", 0x1000),
        build.placeholder_module("B", 0x2000),
        build.placeholder_module("C", 0x3000),
    ];
    let mut sequential = ModuleTable::from_modules(modules.clone()).unwrap();
    let mut parallel = ModuleTable::from_modules(modules).unwrap();

    let seq_report = sequential.fill_all_text_info(&stub_reader(SECTIONS));
    let par_report = parallel.fill_all_text_info_parallel(&stub_reader(SECTIONS));

    assert_eq!(sequential, parallel);
    assert_eq!(seq_report.succeeded, par_report.succeeded);
    assert_eq!(par_report.failed_names().collect::<Vec<_>>(), vec!["C"]);
    assert!(!parallel.get_module("C").unwrap().is_address_complete());
}

#[test]
fn test_fill_collects_failures() {
    let build = BuildDir::new();
    let no_base = Module::new("NoBase")
        .unwrap()
        .with_artifact_path(build.write("NoBase.debug", b""))
        .unwrap();
    let mut table =
        ModuleTable::from_modules([build.placeholder_module("A", 0x1000), no_base]).unwrap();

    let report = table.fill_all_text_info(&stub_reader(SECTIONS));
    assert_eq!(report.succeeded, vec!["A"]);
    assert_eq!(
        report.failure("NoBase").map(|e| e.kind()),
        Some(ErrorKind::MissingImageBase)
    );
    assert!(table.get_module("A").unwrap().is_address_complete());
}

#[test]
fn test_strict_fill_rolls_back_chained_overlap() {
    let build = BuildDir::new();
    let mut table = strict_table([
        build.placeholder_module("A", 0x1000),
        build.placeholder_module("B", 0x1080),
        build.placeholder_module("C", 0x1100),
    ]);

    let report = table.fill_all_text_info(&stub_reader(AT_BASE));
    assert_eq!(report.succeeded, vec!["A", "C"]);
    assert_eq!(report.failed_names().collect::<Vec<_>>(), vec!["B"]);
    match report.failure("B") {
        Some(ModuleError::Overlap { first, second }) => {
            assert_eq!((first.as_str(), second.as_str()), ("A", "B"));
        }
        other => panic!("expected overlap, got {other:?}"),
    }

    assert!(!table.get_module("B").unwrap().is_address_complete());
    assert!(table.get_module("C").unwrap().is_address_complete());
    assert!(table.overlapping_pairs().is_empty());
}

#[test]
fn test_strict_fill_reports_each_module_once() {
    let build = BuildDir::new();
    let mut table = strict_table([
        build.placeholder_module("A", 0x1000),
        build.placeholder_module("B", 0x1040),
        build.placeholder_module("C", 0x1080),
    ]);

    let report = table.fill_all_text_info_parallel(&stub_reader(AT_BASE));
    assert_eq!(report.len(), 3);
    assert_eq!(report.succeeded, vec!["A"]);
    assert_eq!(report.failed_names().collect::<Vec<_>>(), vec!["B", "C"]);
    assert!(report
        .failed
        .iter()
        .all(|(_, e)| e.kind() == ErrorKind::Overlap));
}

#[test]
fn test_strict_fill_restores_previous_bounds() {
    let build = BuildDir::new();
    let mut b = build.placeholder_module("B", 0x5000);
    b.set_address_info(Address::new(0x5000), Address::new(0x5000), Address::new(0x5100), 0x100)
        .unwrap();
    let mut table = strict_table([build.placeholder_module("A", 0x1000), b]);
    table.set_image_base("B", Address::new(0x1080)).unwrap();

    let report = table.fill_all_text_info(&stub_reader(AT_BASE));
    assert_eq!(report.failure("B").map(|e| e.kind()), Some(ErrorKind::Overlap));

    let b = table.get_module("B").unwrap();
    assert_eq!(b.text_start(), Some(Address::new(0x5000)));
    assert_eq!(b.text_end(), Some(Address::new(0x5100)));
    assert_eq!(table.names().collect::<Vec<_>>(), vec!["A", "B"]);
}

#[test]
fn test_strict_fill_result_reloads_strict() {
    let build = BuildDir::new();
    let mut table = strict_table([
        build.placeholder_module("A", 0x1000),
        build.placeholder_module("B", 0x1040),
        build.placeholder_module("C", 0x1080),
    ]);
    table.fill_all_text_info(&stub_reader(AT_BASE));

    let path = build.path().join("modules.json");
    table.write_to_file(&path, None, true).unwrap();
    let reloaded = ModuleTable::read_from_file_with_config(&path, table.config().clone()).unwrap();
    assert_eq!(reloaded, table);
}

#[test]
fn test_address_order_is_non_decreasing() {
    let build = BuildDir::new();
    let mut table = ModuleTable::new();
    for (name, base) in [("Z", 0x9000u64), ("M", 0x1000), ("A", 0x5000), ("Q", 0x3000)] {
        table
            .add_module(Module::create(
                name,
                Some(Address::new(base)),
                Some(build.debug_elf(name, 0x240, 0x800)),
                None,
                None,
            )
            .unwrap())
            .unwrap();
    }

    let report = table.fill_all_text_info_parallel(&ObjectArtifactReader::default());
    assert!(report.is_success(), "{report}");

    let starts: Vec<Address> = table.modules().filter_map(Module::text_start).collect();
    assert_eq!(starts.len(), 4);
    assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(table.names().collect::<Vec<_>>(), vec!["M", "Q", "A", "Z"]);
}

#[test]
fn test_real_artifacts_elf_and_pe() {
    let build = BuildDir::new();
    let pei = Module::create(
        "PeiCore",
        Some(Address::new(0xfffcc000)),
        Some(build.debug_elf("PeiCore", 0x240, 0x5000)),
        None,
        None,
    )
    .unwrap();
    let dxe = Module::create(
        "DxeCore",
        Some(Address::new(0x7e8e8000)),
        Some(build.efi_image("DxeCore", 0x1000, 0x24000)),
        None,
        None,
    )
    .unwrap();
    let mut table = ModuleTable::from_modules([pei, dxe]).unwrap();

    let reader = ObjectArtifactReader::from_config(&ModuleConfig::default());
    let report = table.fill_all_text_info(&reader);
    assert!(report.is_success(), "{report}");

    let dxe = table.get_module("DxeCore").unwrap();
    assert_eq!(dxe.text_start(), Some(Address::new(0x7e8e9000)));
    assert_eq!(dxe.text_end(), Some(Address::new(0x7e90d000)));

    let pei = table.get_module("PeiCore").unwrap();
    assert_eq!(pei.text_range().unwrap().to_string(), "[0xfffcc240, 0xfffd1240)");
    assert_eq!(table.module_at(Address::new(0xfffcd000)).unwrap().name(), "PeiCore");
}

#[test]
fn test_unreadable_artifact_is_reported() {
    let build = BuildDir::new();
    let mut table = ModuleTable::from_modules([
        build.placeholder_module("Empty", 0x1000),
        Module::create(
            "Good",
            Some(Address::new(0x2000)),
            Some(build.debug_elf("Good", 0x10, 0x10)),
            None,
            None,
        )
        .unwrap(),
    ])
    .unwrap();

    let report = table.fill_all_text_info(&ObjectArtifactReader::default());
    assert_eq!(report.succeeded, vec!["Good"]);
    assert_eq!(
        report.failure("Empty").map(|e| e.kind()),
        Some(ErrorKind::ArtifactRead)
    );
    assert!(!table.get_module("Empty").unwrap().is_address_complete());
}

#[test]
fn test_debug_file_next_to_efi() {
    let build = BuildDir::new();
    let efi = build.efi_image("SecMain", 0x1000, 0x800);
    let debug = build.debug_elf("SecMain", 0x240, 0x800);

    let module = Module::create("SecMain", None, Some(efi.clone()), None, None).unwrap();
    assert_eq!(module.debug_path(), Some(debug.as_path()));
    assert_eq!(module.resolved_artifact(), Some(efi.as_path()));
}

#[test]
fn test_reload_keeps_unset_debug_path() {
    let build = BuildDir::new();
    let efi = build.efi_image("SecMain", 0x1000, 0x800);
    let mut table = ModuleTable::from_modules([Module::new("SecMain")
        .unwrap()
        .with_image_base(Address::new(0xfffc0000))
        .with_artifact_path(&efi)
        .unwrap()])
    .unwrap();
    table.fill_all_text_info(&ObjectArtifactReader::default());
    build.debug_elf("SecMain", 0x240, 0x800);

    let path = build.path().join("modules.json");
    table.write_to_file(&path, None, true).unwrap();
    let reloaded = ModuleTable::read_from_file(&path).unwrap();
    assert_eq!(reloaded, table);
    assert!(reloaded.get_module("SecMain").unwrap().debug_path().is_none());
}

#[test]
fn test_persist_and_reload() {
    let build = BuildDir::new();
    let mut table = ModuleTable::from_modules([
        build.placeholder_module("A", 0x1000),
        build.placeholder_module("B", 0x2000),
        build.placeholder_module("C", 0x3000),
    ])
    .unwrap();
    table.fill_all_text_info(&stub_reader(SECTIONS));

    let path = build.path().join("modules.json");
    table.write_to_file(&path, None, true).unwrap();
    let reloaded = ModuleTable::read_from_file(&path).unwrap();
    assert_eq!(reloaded, table);

    let c = reloaded.get_module("C").unwrap();
    assert!(c.text_start().is_none());
    assert_eq!(c.img_base(), Some(Address::new(0x3000)));

    let only_a: BTreeSet<String> = ["A".to_string()].into();
    table.write_to_file(&path, Some(&only_a), false).unwrap();
    let reloaded = ModuleTable::read_from_file(&path).unwrap();
    assert_eq!(reloaded.names().collect::<Vec<_>>(), vec!["A"]);
}

#[test]
fn test_reload_integer_addresses() {
    let json = r#"[
        {"name": "PeiCore", "img_base": 4294754304, "text_start": 4294754880,
         "text_end": 4294775360, "text_size": 20480,
         "binary_path": null, "debug_path": null, "efi_path": null}
    ]"#;
    let table = ModuleTable::from_json(json).unwrap();
    let module = table.get_module("PeiCore").unwrap();
    assert_eq!(module.img_base(), Some(Address::new(0xfffcc000)));
    assert_eq!(module.text_start(), Some(Address::new(0xfffcc240)));

    let json = table.to_json(None, false).unwrap();
    assert!(json.contains(r#""img_base":"0xfffcc000""#));
}

#[test]
fn test_load_errors_leave_no_table() {
    let build = BuildDir::new();
    let path = build.write("bad.json", br#"[{"name": "A"}, {"name": "A"}]"#);
    let err = ModuleTable::read_from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateModuleName);

    let path = build.write("partial.json", br#"[{"name": "A""#);
    let err = ModuleTable::read_from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRecord);

    let missing = build.path().join("A.debug");
    let text = format!(r#"[{{"name": "A", "binary_path": "{}"}}]"#, missing.display());
    let err = ModuleTable::from_json(&text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRecord);
}

#[test]
fn test_strict_table_from_config() {
    let config = ModuleConfig::from_json_str(r#"{"table": {"strict_overlap": true}}"#).unwrap();
    let json = r#"[
        {"name": "A", "img_base": "0x1000", "text_start": "0x1000", "text_end": "0x2000", "text_size": 4096},
        {"name": "B", "img_base": "0x1800", "text_start": "0x1800", "text_end": "0x1900", "text_size": 256}
    ]"#;
    let err = ModuleTable::from_json_with_config(json, config.table).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overlap);

    let lenient = ModuleTable::from_json_with_config(json, TableConfig::default()).unwrap();
    assert_eq!(lenient.overlapping_pairs().len(), 1);
}

#[test]
fn test_render_table_layout() {
    let table = ModuleTable::from_json(
        r#"[{"name": "PeiCore", "img_base": "0xfffcc000", "text_start": "0xfffcc240",
             "text_end": "0xfffd1240", "text_size": 20480}]"#,
    )
    .unwrap();

    let lines = table.render_table(&RenderOptions::default());
    assert_eq!(
        lines[0],
        format!(
            "{:<32} {:<12} {:<12} {:<12} {:>8} Path",
            "Module Name", "Image Base", ".text Start", ".text End", "Size"
        )
    );
    assert_eq!(
        lines[1],
        format!(
            "{:<32} 0000fffcc000 0000fffcc240 0000fffd1240    20480",
            "PeiCore"
        )
    );

    let filtered = table.render_table(&RenderOptions::default().with_filter(["DxeCore"]));
    assert_eq!(filtered.len(), 1);
}

#[test]
fn test_scenario_errors() {
    let table = ModuleTable::new();
    assert_eq!(table.get_module("missing").unwrap_err().kind(), ErrorKind::ModuleNotFound);
    assert_eq!(Module::new("").unwrap_err().kind(), ErrorKind::InvalidName);
    assert_eq!(
        Module::create("A", None, Some("/nonexistent".into()), None, None)
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidPath
    );
}
