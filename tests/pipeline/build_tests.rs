//! Full build behavior over real source trees

use std::collections::BTreeMap;
use std::fs;

use jet_engine::{build_all, JetContext, JetError};

use crate::common::{sample_repo, TestRepo};

#[test]
fn test_build_records_sync_and_async_deps() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);

    let (infos, report) = build_all(ctx.pipeline(), ctx.store()).unwrap();
    assert_eq!(report.files, 5);
    assert_eq!(report.packages, 2);
    assert_eq!(report.modules, 5);

    let app = repo.package_map("app");
    let main = app.get("app/main").unwrap();
    assert_eq!(main.path, "app/main.js");
    assert_eq!(main.sync_deps, vec!["app/util", "lib/core"]);
    assert_eq!(main.async_deps, vec!["app/lazy"]);
    assert_eq!(infos["app"], app);

    let lib = repo.package_map("lib");
    assert_eq!(lib.get("lib/helper").unwrap().sync_deps, vec!["lib/core"]);
    assert!(repo.artifact("app/main.js").contains("define("));
}

#[test]
fn test_anonymous_define_gets_its_id_in_the_artifact() {
    let repo = sample_repo();
    let ctx = repo.context(&["app"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    assert!(repo.artifact("app/lazy.js").contains("'app/lazy'"));
}

#[test]
fn test_hashed_build_is_deterministic_across_runs() {
    let repo = sample_repo();
    let first = repo.context(&["app", "lib"], true);
    let (first_infos, _) = build_all(first.pipeline(), first.store()).unwrap();

    let mut config = repo.config(&["app", "lib"], true);
    config.build.dist_dir = Some(repo.path().join("dist2"));
    config.build.map_dir = Some(repo.path().join("map2"));
    let second = JetContext::new(config);
    let (second_infos, _) = build_all(second.pipeline(), second.store()).unwrap();

    assert_eq!(first_infos, second_infos);
    for entry in first_infos.values().flat_map(|p| p.map.values()) {
        assert_ne!(entry.path, "app/main.js");
        let a = fs::read(repo.dist().join(&entry.path)).unwrap();
        let b = fs::read(repo.path().join("dist2").join(&entry.path)).unwrap();
        assert_eq!(a, b, "artifact {} differs between runs", entry.path);
    }

    let first_map = fs::read_to_string(repo.map().join("app.conf.json")).unwrap();
    let second_map = fs::read_to_string(repo.path().join("map2/app.conf.json")).unwrap();
    assert_eq!(first_map, second_map);
}

#[test]
fn test_hashed_path_follows_content() {
    let repo = sample_repo();
    let ctx = repo.context(&["app"], true);
    let (infos, _) = build_all(ctx.pipeline(), ctx.store()).unwrap();
    let before = infos["app"].get("app/util").unwrap().path.clone();
    let unchanged = infos["app"].get("app/main").unwrap().path.clone();

    // The copy at the source-derived path is kept next to the hashed artifact
    assert_eq!(repo.artifact(&before), repo.artifact("app/util.js"));

    repo.add_file("app/util.js", "define([], function () { return 2; });\n");
    let (infos, _) = build_all(ctx.pipeline(), ctx.store()).unwrap();

    assert_ne!(infos["app"].get("app/util").unwrap().path, before);
    assert_eq!(infos["app"].get("app/main").unwrap().path, unchanged);
}

#[test]
fn test_duplicate_module_id_fails_the_whole_build() {
    let repo = TestRepo::new();
    repo.add_file("app/a.js", "define('app/shared', [], function () {});\n")
        .add_file("app/b.js", "define('app/shared', [], function () {});\n")
        .add_file("lib/x.js", "define([], function () {});\n");
    let ctx = repo.context(&["app", "lib"], false);

    let err = build_all(ctx.pipeline(), ctx.store()).unwrap_err();
    match err {
        JetError::DuplicateModule {
            package,
            module_id,
            first,
            second,
        } => {
            assert_eq!(package, "app");
            assert_eq!(module_id, "app/shared");
            assert_eq!(first, "app/a.js");
            assert_eq!(second, "app/b.js");
        }
        other => panic!("expected duplicate module error, got {other}"),
    }
    assert!(!repo.has_package_map("app"));
    assert!(!repo.has_package_map("lib"));
}

#[test]
fn test_analysis_failure_names_the_file() {
    let repo = TestRepo::new();
    repo.add_file("app/ok.js", "define([], function () {});\n")
        .add_file("app/broken.js", "define([], function () {\n");
    let ctx = repo.context(&["app"], false);

    let err = build_all(ctx.pipeline(), ctx.store()).unwrap_err();
    assert!(matches!(err, JetError::Analyze(_)));
    assert!(err.to_string().contains("broken.js"), "{err}");
    assert!(!repo.has_package_map("app"));
}

#[test]
fn test_unselected_packages_are_not_built() {
    let repo = sample_repo();
    let ctx = repo.context(&["app"], false);

    let (infos, _) = build_all(ctx.pipeline(), ctx.store()).unwrap();
    assert_eq!(infos.keys().collect::<Vec<_>>(), vec!["app"]);
    assert!(!repo.has_package_map("lib"));
    assert!(!repo.dist().join("lib").exists());
}

#[test]
fn test_top_level_file_is_its_own_package() {
    let repo = TestRepo::new();
    repo.add_file("zepto.js", "define([], function () {});\n");
    let mut config = repo.config(&["zepto"], false);
    config.build.all = true;
    config.resolve_packages().unwrap();
    let ctx = JetContext::new(config);

    let (infos, _) = build_all(ctx.pipeline(), ctx.store()).unwrap();
    let expected: BTreeMap<_, _> = [("zepto".to_string(), repo.package_map("zepto"))].into();
    assert_eq!(infos, expected);
    assert_eq!(infos["zepto"].get("zepto").unwrap().path, "zepto.js");
}

#[test]
fn test_output_dir_inside_source_root_is_not_rebuilt() {
    let repo = TestRepo::new();
    repo.add_file("app/a.js", "define([], function () {});\n");

    let mut config = jet_engine::JetConfig::for_source(&repo.src()).unwrap();
    config.build.dist_dir = Some("src/out".into());
    config.build.map_dir = Some(repo.map());
    config.build.use_hash = false;
    config.build.all = true;
    config.anchor_output_dirs(repo.path());
    config.resolve_packages().unwrap();
    let ctx = JetContext::new(config);

    let (first, _) = build_all(ctx.pipeline(), ctx.store()).unwrap();
    assert!(repo.src().join("out/app/a.js").exists());
    let (second, report) = build_all(ctx.pipeline(), ctx.store()).unwrap();

    assert_eq!(first.keys().collect::<Vec<_>>(), vec!["app"]);
    assert_eq!(second.keys().collect::<Vec<_>>(), vec!["app"]);
    assert_eq!(report.files, 1);

    // A later `--all` discovery skips the populated output directory
    let mut config = jet_engine::JetConfig::for_source(&repo.src()).unwrap();
    config.build.dist_dir = Some(repo.src().join("out"));
    config.build.all = true;
    config.resolve_packages().unwrap();
    assert_eq!(config.build.packages, vec!["app"]);
}
