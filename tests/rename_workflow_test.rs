/*!
 * End-to-end rename workflow tests
 *
 * Builds real bags with correct checksums, runs rename sessions against them
 * and checks that the bag stays valid: payload manifests list the new names,
 * tag manifests carry the new payload manifest checksums.
 */

mod common;

use bagmend::manifest::{hash_file, DigestAlgorithm, Package, RenameMap};
use bagmend::{
    BagDirectory, BagError, ConfirmationReport, NamingConvention, RenameLog, RenameOptions,
    RenamePlan, RenameSession,
};
use common::BagFixture;

fn execute_options() -> RenameOptions {
    RenameOptions {
        dry_run: false,
        processes: 2,
        log: RenameLog::Disabled,
        ..RenameOptions::default()
    }
}

fn files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("data/folder01/img001.tif", "image one"),
        ("data/folder01/img002.tif", "image two"),
        ("data/folder02/notes.txt", "some notes"),
    ]
}

#[test]
fn test_dry_run_leaves_bag_byte_identical() {
    let fixture = BagFixture::new("ms-0412-bag", &files());
    let before = fixture.snapshot();

    let bag = BagDirectory::open(fixture.path()).unwrap();
    let outcome = RenameSession::new(RenameOptions::default(), Default::default())
        .run(&bag, &RenamePlan::Convention(NamingConvention::default()))
        .unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.successes, 3);
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_convention_rename_keeps_bag_valid() {
    let fixture = BagFixture::new("ms-0412-bag", &files());
    let bag = BagDirectory::open(fixture.path()).unwrap();

    let outcome = RenameSession::new(execute_options(), Default::default())
        .run(&bag, &RenamePlan::Convention(NamingConvention::default()))
        .unwrap();

    assert_eq!(outcome.successes, 3);
    assert_eq!(outcome.failures, 0);
    assert!(outcome.validated_before.is_some());
    assert!(outcome.validated_after.is_some());

    let manifest = fixture.read("manifest-sha256.txt");
    assert!(manifest.contains("data/folder01/jhu_ms-0412_folder01-img001.tif"));
    assert!(manifest.contains("data/folder02/jhu_ms-0412_folder02-notes.txt"));
    assert!(!manifest.contains("data/folder01/img002.tif"));

    // The tag manifests reference the rewritten payload manifests
    let md5_of_manifest =
        hash_file(&fixture.path().join("manifest-sha256.txt"), DigestAlgorithm::Md5).unwrap();
    assert!(fixture
        .read("tagmanifest-md5.txt")
        .contains(&format!("{} manifest-sha256.txt", md5_of_manifest)));

    BagDirectory::open(fixture.path()).unwrap().validate().unwrap();
}

#[test]
fn test_second_run_counts_previously_renamed() {
    let fixture = BagFixture::new("ms-0412-bag", &files());
    let session = RenameSession::new(execute_options(), Default::default());
    let plan = RenamePlan::Convention(NamingConvention::default());

    session.run(&BagDirectory::open(fixture.path()).unwrap(), &plan).unwrap();
    let before = fixture.snapshot();

    let outcome = session.run(&BagDirectory::open(fixture.path()).unwrap(), &plan).unwrap();
    assert_eq!(outcome.previously_renamed, 3);
    assert_eq!(outcome.successes, 0);
    assert!(outcome.rehash.unwrap().skipped);
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_map_rename_then_inverse_restores_manifests() {
    let fixture = BagFixture::new("coll-a-bag", &files());
    let original_md5 = fixture.read("manifest-md5.txt");
    let original_tag = fixture.read("tagmanifest-sha512.txt");

    let map = RenameMap::from_pairs([
        ("data/folder01/img001.tif", "data/renamed/first.tif"),
        ("data/folder02/notes.txt", "data/folder02/README.txt"),
    ])
    .unwrap();
    let session = RenameSession::new(execute_options(), Default::default());

    session
        .run(&BagDirectory::open(fixture.path()).unwrap(), &RenamePlan::Map(map.clone()))
        .unwrap();
    assert!(fixture.path().join("data/renamed/first.tif").is_file());
    assert_ne!(fixture.read("manifest-md5.txt"), original_md5);

    session
        .run(
            &BagDirectory::open(fixture.path()).unwrap(),
            &RenamePlan::Map(map.inverse().unwrap()),
        )
        .unwrap();
    assert_eq!(fixture.read("manifest-md5.txt"), original_md5);
    assert_eq!(fixture.read("tagmanifest-sha512.txt"), original_tag);
}

#[test]
fn test_unlisted_rename_is_reported_unmatched() {
    let fixture = BagFixture::new("coll-a-bag", &files());
    // A payload file the manifests do not know about
    std::fs::write(fixture.path().join("data/stray.txt"), "stray").unwrap();

    let options = RenameOptions {
        validate_before: false,
        validate_after: false,
        ..execute_options()
    };
    let map = RenameMap::from_pairs([("data/stray.txt", "data/stray-renamed.txt")]).unwrap();
    let outcome = RenameSession::new(options, Default::default())
        .run(&BagDirectory::open(fixture.path()).unwrap(), &RenamePlan::Map(map))
        .unwrap();

    assert_eq!(outcome.rehash.unwrap().unmatched, vec!["data/stray.txt"]);
}

#[test]
fn test_unsupported_tag_algorithm_aborts_before_any_write() {
    let fixture = BagFixture::new("coll-a-bag", &files());
    std::fs::write(fixture.path().join("tagmanifest-sha3.txt"), "").unwrap();
    let before = fixture.snapshot();

    let options = RenameOptions {
        validate_before: false,
        ..execute_options()
    };
    let map = RenameMap::from_pairs([("data/folder01/img001.tif", "data/x.tif")]).unwrap();
    let err = RenameSession::new(options, Default::default())
        .run(&BagDirectory::open(fixture.path()).unwrap(), &RenamePlan::Map(map))
        .unwrap_err();

    assert!(matches!(err, BagError::Manifest(_)));
    assert!(fixture.path().join("data/folder01/img001.tif").is_file());
    assert!(!fixture.path().join("data/x.tif").exists());
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_confirmation_after_rename() {
    let fixture = BagFixture::new("ms-0412-bag", &files());
    let bag = BagDirectory::open(fixture.path()).unwrap();
    let outcome = RenameSession::new(execute_options(), Default::default())
        .run(&bag, &RenamePlan::Convention(NamingConvention::default()))
        .unwrap();

    let report = ConfirmationReport::build(fixture.path(), &outcome.applied).unwrap();
    assert!(report.is_confirmed());
    assert!(report.unlogged.is_empty());
}
