use salesline::db::DbConnection;
use salesline::engine::{PipelineBoard, PipelineError};
use salesline::models::{Direction, StageOrder};
use salesline::repo::{LeadRepo, NewLead};
use salesline::service::{PipelineService, ServiceError, SqlitePipelineService};

fn service() -> SqlitePipelineService {
    SqlitePipelineService::new(DbConnection::connect_in_memory().unwrap())
}

fn add_lead(service: &SqlitePipelineService, pipeline: i64, stage: i64, name: &str, value: f64) -> i64 {
    let conn = service.connection();
    let fields = NewLead { name: name.to_string(), value, ..Default::default() };
    LeadRepo::create(&conn, pipeline, stage, &fields).unwrap().id
}

#[test]
fn test_board_changes_are_persisted() {
    let service = service();
    let pipeline = service.default_pipeline_id().unwrap();
    let board = PipelineBoard::open(service, pipeline).unwrap();

    let new = board.add_stage("New").unwrap();
    let contacted = board.add_stage("Contacted").unwrap();
    let won = board.add_stage("Won").unwrap();
    let lead = add_lead(board.service(), pipeline, new.id, "Acme", 50000.0);
    board.refresh().unwrap();

    board.transition(lead, won.id).unwrap();
    board.move_stage(won.id, Direction::Up).unwrap();
    board.rename_stage(contacted.id, "Qualified").unwrap();

    let stored = board.service().list_stages(pipeline).unwrap();
    let names: Vec<&str> = stored.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["New", "Won", "Qualified"]);
    let leads = board.service().list_leads(pipeline).unwrap();
    assert_eq!(leads[0].stage_id, won.id);

    // A fresh load agrees with the live session
    let live = board.view();
    board.refresh().unwrap();
    assert_eq!(board.view().stages, live.stages);
}

#[test]
fn test_stale_delete_is_rejected_and_reverted() {
    let service = service();
    let pipeline = service.default_pipeline_id().unwrap();
    let board = PipelineBoard::open(service, pipeline).unwrap();
    let new = board.add_stage("New").unwrap();
    board.add_stage("Won").unwrap();

    // Someone else adds a lead the session has not loaded yet
    add_lead(board.service(), pipeline, new.id, "Acme", 10.0);
    let before = board.view();

    let err = board.delete_stage(new.id).unwrap_err();

    assert!(matches!(err, PipelineError::ReconciliationFailed { cause: ServiceError::Rejected(_), .. }));
    assert_eq!(board.view(), before);
    assert_eq!(board.service().list_stages(pipeline).unwrap().len(), 2);
}

#[test]
fn test_reorder_requires_every_stage() {
    let service = service();
    let pipeline = service.default_pipeline_id().unwrap();
    let new = service.create_stage(pipeline, "New").unwrap();
    let won = service.create_stage(pipeline, "Won").unwrap();

    let partial = service.reorder_stages(pipeline, &[StageOrder { id: new.id, order: 2 }]);
    assert!(matches!(partial, Err(ServiceError::Rejected(_))));

    let duplicate = service.reorder_stages(
        pipeline,
        &[StageOrder { id: new.id, order: 1 }, StageOrder { id: won.id, order: 1 }],
    );
    assert!(matches!(duplicate, Err(ServiceError::Rejected(_))));

    service
        .reorder_stages(pipeline, &[StageOrder { id: new.id, order: 2 }, StageOrder { id: won.id, order: 1 }])
        .unwrap();
    let names: Vec<String> = service.list_stages(pipeline).unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["Won", "New"]);
}

#[test]
fn test_lead_cannot_leave_its_pipeline() {
    let service = service();
    let sales = service.pipeline_id("sales").unwrap();
    let hiring = service.pipeline_id("hiring").unwrap();
    let new = service.create_stage(sales, "New").unwrap();
    let screen = service.create_stage(hiring, "Screen").unwrap();
    let lead = add_lead(&service, sales, new.id, "Acme", 1.0);

    let result = service.update_lead_stage(lead, screen.id);
    assert!(matches!(result, Err(ServiceError::Rejected(_))));

    let missing = service.update_lead_stage(9999, new.id);
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[test]
fn test_unknown_pipeline_is_not_found() {
    let service = service();
    assert!(matches!(service.list_stages(4242), Err(ServiceError::NotFound(_))));
    assert!(PipelineBoard::open(service, 4242).is_err());
}

#[test]
fn test_stage_color_is_presentation_only() {
    let service = service();
    let pipeline = service.default_pipeline_id().unwrap();
    let stage = service.create_stage(pipeline, "New").unwrap();

    let colored = service.set_stage_color(pipeline, stage.id, Some("teal")).unwrap();
    assert_eq!(colored.color_hint.as_deref(), Some("teal"));

    let stored = service.list_stages(pipeline).unwrap();
    assert_eq!(stored[0].color_hint.as_deref(), Some("teal"));
    assert_eq!(stored[0].order, 1);
}

#[test]
fn test_stage_color_requires_stage_in_pipeline() {
    let service = service();
    let sales = service.pipeline_id("sales").unwrap();
    let hiring = service.pipeline_id("hiring").unwrap();
    let stage = service.create_stage(sales, "New").unwrap();

    let missing = service.set_stage_color(sales, 9999, Some("teal"));
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    let foreign = service.set_stage_color(hiring, stage.id, Some("teal"));
    assert!(matches!(foreign, Err(ServiceError::NotFound(_))));
    assert_eq!(service.list_stages(sales).unwrap()[0].color_hint, None);
}
