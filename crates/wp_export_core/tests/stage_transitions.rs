use wp_export_core::Stage;

#[test]
fn stages_advance_strictly_in_order() {
    let mut stage = Stage::default();
    let mut seen = vec![stage];
    while !stage.is_terminal() {
        stage = stage.advance();
        seen.push(stage);
    }
    assert_eq!(
        seen,
        vec![
            Stage::AuthorsPending,
            Stage::CategoriesPending,
            Stage::PostsPending,
            Stage::Done
        ]
    );
}

#[test]
fn failure_is_reachable_from_every_running_stage() {
    for stage in [
        Stage::AuthorsPending,
        Stage::CategoriesPending,
        Stage::PostsPending,
    ] {
        assert_eq!(stage.fail(), Stage::Failed);
    }
}

#[test]
fn terminal_stages_are_sticky() {
    assert_eq!(Stage::Done.advance(), Stage::Done);
    assert_eq!(Stage::Done.fail(), Stage::Done);
    assert_eq!(Stage::Failed.advance(), Stage::Failed);
}
