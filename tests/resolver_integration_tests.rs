// Canal priority resolution over real CSV files
//
// Covers the end-to-end outcomes: direct listing, inheritance through the
// hierarchy, misses, missing availability windows and source failures.

use canal_priority::resolver::{
    MSG_INHERITED, MSG_NOT_FOUND, MSG_NO_WINDOW_DIRECT, MSG_NO_WINDOW_INHERITED, MSG_PARENT_NOT_IN_PLAN,
};
use canal_priority::{Outcome, PriorityResolver, PriorityTaxonomy, QueryResponse, TableSources};
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const HIERARCHY_CSV: &str = "\
CHANNEL_NA,PARENT_CHA,CHANNEL_TY
Panjnad Canal,,C
Chamman Disty ,Panjnad Canal, D
Unknown Minor, Chamman Disty ,M
Outlet 12,Unknown Minor,W
Khanpur Disty,Panjnad Canal,D
Khanpur Minor,Khanpur Disty,M
Loop Minor,Loop Minor,M
Stray Minor,Ghost Disty,M
";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fixture(rotation_csv: &str) -> (TempDir, TableSources) {
    let dir = tempfile::tempdir().unwrap();
    let hierarchy = dir.path().join("canal_hierarchy.csv");
    let rotation = dir.path().join("rotation_plan.csv");
    fs::write(&hierarchy, HIERARCHY_CSV).unwrap();
    fs::write(&rotation, rotation_csv).unwrap();
    (dir, TableSources::new(hierarchy, rotation))
}

fn october_plan() -> &'static str {
    "\
Start Date,End Date,A,A1,A2,B,B1,B2,C,C1,C2
01-10-2026,11-10-2026,2,1,2,1,2,1,3,3,3
12-10-2026,18-10-2026,1,2,1,,x,2,3,3,3
19-10-2026,25-10-2026,3,3,3,2,1,2,1,2,1
"
}

fn resolver() -> PriorityResolver {
    PriorityResolver::new(Arc::new(PriorityTaxonomy::rabi_default()))
}

fn to_json(response: &QueryResponse) -> Value {
    serde_json::to_value(response).unwrap()
}

#[test]
fn test_direct_listing_reports_group_and_window() {
    let (_dir, sources) = fixture(october_plan());

    let r = resolver().query_on("Nal Disty", &sources, ymd(2026, 10, 15)).unwrap();

    assert_eq!(r.outcome, Outcome::Direct);
    assert_eq!(
        serde_json::to_value(&r).unwrap(),
        json!({
            "canal": "Nal Disty",
            "priority_group": "A",
            "sub_group": "A1",
            "availability": {
                "start_date": "12-10-2026",
                "end_date": "18-10-2026",
                "group_priority": 1,
                "sub_group_priority": 2
            }
        })
    );
}

#[test]
fn test_blank_and_non_numeric_ranks_default_to_999() {
    let (_dir, sources) = fixture(october_plan());

    // B is blank and B1 is "x" in the week of the 12th
    let r = resolver().query_on("Azim Disty", &sources, ymd(2026, 10, 12)).unwrap();

    let window = serde_json::to_value(r.availability.unwrap()).unwrap();
    assert_eq!(window["group_priority"], 999);
    assert_eq!(window["sub_group_priority"], 999);
}

#[test]
fn test_unlisted_canal_inherits_from_distributary() {
    let (_dir, sources) = fixture(october_plan());

    for canal in ["Unknown Minor", "  Outlet 12  "] {
        let r = resolver().query_on(canal, &sources, ymd(2026, 10, 20)).unwrap();

        assert_eq!(r.canal, canal.trim());
        assert_eq!(r.outcome, Outcome::Inherited);
        assert_eq!(r.parent_canal.as_deref(), Some("Chamman Disty"));
        assert_eq!(r.priority_group.as_deref(), Some("A"));
        assert_eq!(r.sub_group.as_deref(), Some("A1"));
        assert_eq!(r.message.as_deref(), Some(MSG_INHERITED));
        assert_eq!(r.availability.unwrap().start_date, "19-10-2026");
    }
}

#[test]
fn test_unknown_canal_is_not_in_season() {
    let (_dir, sources) = fixture(october_plan());

    let r = resolver().query_on("Nowhere Minor", &sources, ymd(2026, 10, 15)).unwrap();

    assert_eq!(r.outcome, Outcome::NotFound);
    assert_eq!(
        serde_json::to_value(&r).unwrap(),
        json!({"canal": "Nowhere Minor", "message": MSG_NOT_FOUND})
    );
}

#[test]
fn test_malformed_hierarchy_links_end_as_not_found() {
    let (_dir, sources) = fixture(october_plan());

    for canal in ["Loop Minor", "Stray Minor"] {
        let r = resolver().query_on(canal, &sources, ymd(2026, 10, 15)).unwrap();
        assert_eq!(r.outcome, Outcome::NotFound, "{}", canal);
    }
}

#[test]
fn test_parent_outside_plan() {
    let (_dir, sources) = fixture(october_plan());

    let r = resolver().query_on("Khanpur Minor", &sources, ymd(2026, 10, 15)).unwrap();

    assert_eq!(r.outcome, Outcome::ParentNotInPlan);
    assert_eq!(
        serde_json::to_value(&r).unwrap(),
        json!({
            "canal": "Khanpur Minor",
            "parent_canal": "Khanpur Disty",
            "message": MSG_PARENT_NOT_IN_PLAN
        })
    );
}

#[test]
fn test_no_window_this_week() {
    let (_dir, sources) = fixture(october_plan());
    let november = ymd(2026, 11, 3);

    let direct = resolver().query_on("Nal Disty", &sources, november).unwrap();
    assert_eq!(direct.priority_group.as_deref(), Some("A"));
    assert_eq!(direct.sub_group.as_deref(), Some("A1"));
    assert!(direct.availability.is_none());
    assert_eq!(direct.message.as_deref(), Some(MSG_NO_WINDOW_DIRECT));

    let inherited = resolver().query_on("Unknown Minor", &sources, november).unwrap();
    assert_eq!(inherited.parent_canal.as_deref(), Some("Chamman Disty"));
    assert!(inherited.availability.is_none());
    assert_eq!(inherited.message.as_deref(), Some(MSG_NO_WINDOW_INHERITED));
}

#[test]
fn test_plan_without_group_columns_has_no_window() {
    let (_dir, sources) = fixture("Start Date,End Date,A\n01-10-2026,31-10-2026,1\n");

    let r = resolver().query_on("Nal Disty", &sources, ymd(2026, 10, 15)).unwrap();

    assert_eq!(r.outcome, Outcome::Direct);
    assert!(r.availability.is_none());
}

#[test]
fn test_query_uses_todays_date() {
    let today = canal_priority::resolver::today();
    let plan = format!(
        "Start Date,End Date,C,C2\n{},{},1,2\n",
        (today - Duration::days(3)).format("%d/%m/%Y"),
        (today + Duration::days(3)).format("%d/%m/%Y"),
    );
    let (_dir, sources) = fixture(&plan);

    let response = resolver().query_canal("Sultan Disty", &sources);
    let json = to_json(&response);

    assert_eq!(json["priority_group"], "C");
    assert_eq!(json["sub_group"], "C2");
    assert_eq!(json["availability"]["group_priority"], 1);
    assert_eq!(json["availability"]["sub_group_priority"], 2);
}

#[test]
fn test_repeated_queries_are_identical() {
    let (_dir, sources) = fixture(october_plan());
    let day = ymd(2026, 10, 15);

    let first = resolver().query_on("Unknown Minor", &sources, day).unwrap();
    let second = resolver().query_on("Unknown Minor", &sources, day).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_missing_source_yields_single_error_payload() {
    let (dir, _) = fixture(october_plan());
    let sources = TableSources::new(
        dir.path().join("no_such_hierarchy.csv"),
        dir.path().join("rotation_plan.csv"),
    );

    let response = resolver().query_canal("Nal Disty", &sources);
    assert!(response.is_error());

    let json = to_json(&response);
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(json["kind"], "source_missing");
    assert!(json["error"].as_str().unwrap().contains("no_such_hierarchy.csv"));
    assert!(json.get("canal").is_none());
}

#[test]
fn test_malformed_rotation_yields_error_payload() {
    let (_dir, sources) = fixture("Week,A,A1\n1,1,2\n");

    let response = resolver().query_canal("Nal Disty", &sources);
    let json = to_json(&response);

    assert_eq!(json["kind"], "missing_column");
    assert!(json.get("priority_group").is_none());
}

#[test]
fn test_custom_taxonomy_file() {
    let (dir, sources) = fixture(october_plan());
    let taxonomy_path: PathBuf = dir.path().join("taxonomy.json");
    fs::write(
        &taxonomy_path,
        r#"{
            "main_groups": [{"name": "B", "sub_groups": ["B2"]}],
            "sub_groups": [{"name": "B2", "canals": ["Khanpur Disty"]}]
        }"#,
    )
    .unwrap();

    let taxonomy = PriorityTaxonomy::load(&taxonomy_path).unwrap();
    let resolver = PriorityResolver::new(Arc::new(taxonomy));

    let r = resolver.query_on("Khanpur Minor", &sources, ymd(2026, 10, 15)).unwrap();
    assert_eq!(r.outcome, Outcome::Inherited);
    assert_eq!(r.sub_group.as_deref(), Some("B2"));

    let listed_before = resolver.query_on("Nal Disty", &sources, ymd(2026, 10, 15)).unwrap();
    assert_eq!(listed_before.outcome, Outcome::NotFound);
}
