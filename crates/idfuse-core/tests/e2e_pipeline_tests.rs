use idfuse_core::{persist, AppConfig, Fid, FusionEngine, Registry};
use std::fs;
use std::path::Path;

fn write_streets_fixture(dir: &Path) -> AppConfig {
    fs::write(
        dir.join("streets_a.csv"),
        "id,name,county\na1,Oak St,North\na2,Elm St,South\n",
    )
    .unwrap();
    fs::write(
        dir.join("streets_b.csv"),
        "item,label\nhttp://www.wikidata.org/entity/Q100,Oak St\n",
    )
    .unwrap();
    fs::write(
        dir.join("registry.csv"),
        format!(
            "ds_name,enabled,filename,id_type,col_id,col_name,col_key,src_id\n\
             streets_a,1,{a},,id,name,,a\n\
             streets_b,1,{b},wikidata,item,label,,b\n\
             retired,0,{missing},,id,name,,z\n",
            a = dir.join("streets_a.csv").display(),
            b = dir.join("streets_b.csv").display(),
            missing = dir.join("does_not_exist.csv").display(),
        ),
    )
    .unwrap();

    AppConfig {
        registry_path: dir.join("registry.csv").display().to_string(),
        fusion_path: dir.join("output/fusion.csv").display().to_string(),
        seed_path: dir.join("seed.csv").display().to_string(),
        listing_path: dir.join("output/fid_name.csv").display().to_string(),
        compare_dir: dir.join("output").display().to_string(),
    }
}

fn engine_for(config: &AppConfig) -> FusionEngine {
    let registry = Registry::load(Path::new(&config.registry_path)).unwrap();
    FusionEngine::new(config.clone(), registry)
}

#[test]
fn test_full_fusion_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());

    let result = engine_for(&config).fuse(false).unwrap();
    assert_eq!(result.reloaded_records, 0);
    assert_eq!(result.datasets_loaded, 2); // the disabled dataset is skipped
    assert_eq!(result.names_indexed, 2);
    assert_eq!(result.rows_merged, 3);
    assert_eq!(result.master_records, 2);

    // Wikidata id normalized at load: b@Q100, not the entity URL.
    let table = persist::load_file(Path::new(&config.fusion_path)).unwrap();
    let oak = table.get(&Fid::from("a@a1")).unwrap();
    assert_eq!(oak.guess_link, vec![Fid::from("b@Q100")]);
    assert!(!table.contains(&Fid::from("b@Q100")));
    assert!(table.get(&Fid::from("a@a2")).unwrap().guess_link.is_empty());
}

#[test]
fn test_fusion_exports_audit_listing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());

    engine_for(&config).fuse(false).unwrap();

    let listing = fs::read_to_string(&config.listing_path).unwrap();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(
        lines,
        vec!["fid,name", "a@a1,Oak St", "a@a2,Elm St", "b@Q100,Oak St"]
    );
}

#[test]
fn test_second_run_is_idempotent_and_backed_up() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());
    let engine = engine_for(&config);

    engine.fuse(false).unwrap();
    let second = engine.fuse(false).unwrap();

    // Second run resumes from the saved table and changes nothing.
    assert_eq!(second.reloaded_records, 2);
    assert_eq!(second.master_records, 2);
    let table = persist::load_file(Path::new(&config.fusion_path)).unwrap();
    assert_eq!(
        table.get(&Fid::from("a@a1")).unwrap().guess_link,
        vec![Fid::from("b@Q100")]
    );

    // And the first run's output survives as a timestamped backup.
    let backups = fs::read_dir(dir.path().join("output"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("fusion_"))
        .count();
    assert_eq!(backups, 1);
}

#[test]
fn test_seed_links_survive_merge() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());
    fs::write(
        &config.seed_path,
        "fid_master,name,fid_link,guess_link,content\na@a1,Oak St,x@x1,,\n",
    )
    .unwrap();

    let result = engine_for(&config).fuse(false).unwrap();
    assert_eq!(result.reloaded_records, 1);

    let table = persist::load_file(Path::new(&config.fusion_path)).unwrap();
    let oak = table.get(&Fid::from("a@a1")).unwrap();
    assert_eq!(oak.fid_link, vec![Fid::from("x@x1")]);
    assert_eq!(oak.guess_link, vec![Fid::from("b@Q100")]);
}

#[test]
fn test_content_aggregation_spans_linked_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());

    engine_for(&config).fuse(true).unwrap();

    let text = fs::read_to_string(&config.fusion_path).unwrap();
    let oak_line = text
        .lines()
        .find(|l| l.starts_with("a@a1,"))
        .unwrap();
    // Column=value pairs from both the master row and the guessed link,
    // quoted as one field.
    assert!(oak_line
        .contains("\"id=a1|name=Oak St|county=North|item=Q100|label=Oak St\""));

    let elm_line = text.lines().find(|l| l.starts_with("a@a2,")).unwrap();
    assert!(elm_line.contains("\"id=a2|name=Elm St|county=South\""));
}

#[test]
fn test_content_skips_unknown_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());
    // Seed links a@a1 to a source id no dataset owns; aggregation must
    // skip it and still gather the rest.
    fs::write(
        &config.seed_path,
        "fid_master,name,fid_link,guess_link,content\na@a1,Oak St,zz@unknown,,\n",
    )
    .unwrap();

    engine_for(&config).fuse(true).unwrap();

    let text = fs::read_to_string(&config.fusion_path).unwrap();
    let oak_line = text.lines().find(|l| l.starts_with("a@a1,")).unwrap();
    let content = oak_line.split('"').nth(1).unwrap();
    assert!(content.contains("id=a1|name=Oak St|county=North"));
    assert!(!content.contains("unknown"));
}

#[test]
fn test_integer_typed_id_lookup_coerces() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("nums.csv"), "num_id,name\n7,Seven\n").unwrap();
    fs::write(
        dir.path().join("registry.csv"),
        format!(
            "ds_name,enabled,filename,id_type,col_id,col_name,col_key,src_id\n\
             nums,1,{},int,num_id,name,,n\n",
            dir.path().join("nums.csv").display(),
        ),
    )
    .unwrap();
    // The seed master uses a zero-padded local id; the integer-typed
    // lookup still finds row 7.
    fs::write(
        dir.path().join("seed.csv"),
        "fid_master,name,fid_link,guess_link,content\nn@07,Seven,,,\n",
    )
    .unwrap();

    let config = AppConfig {
        registry_path: dir.path().join("registry.csv").display().to_string(),
        fusion_path: dir.path().join("output/fusion.csv").display().to_string(),
        seed_path: dir.path().join("seed.csv").display().to_string(),
        listing_path: dir.path().join("output/fid_name.csv").display().to_string(),
        compare_dir: dir.path().join("output").display().to_string(),
    };

    engine_for(&config).fuse(true).unwrap();

    let text = fs::read_to_string(&config.fusion_path).unwrap();
    let line = text.lines().find(|l| l.starts_with("n@07,")).unwrap();
    assert!(line.contains("num_id=7|name=Seven"));
}

#[test]
fn test_scan_exports_listing_without_touching_fusion_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());

    let pass = engine_for(&config).scan().unwrap();
    assert_eq!(pass.index.len(), 2);
    assert_eq!(pass.listing.len(), 3);

    let listing = fs::read_to_string(&config.listing_path).unwrap();
    assert!(listing.starts_with("fid,name"));
    // Scan alone never reloads or rewrites the fusion table.
    assert!(!Path::new(&config.fusion_path).exists());
}

#[test]
fn test_info_reports_per_source_counts() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_streets_fixture(dir.path());
    let engine = engine_for(&config);

    engine.fuse(false).unwrap();
    let stats = engine.info().unwrap();
    // Both master records come from source "a"; b@Q100 is only a link.
    assert_eq!(stats, vec![("a".to_string(), 2)]);
}
