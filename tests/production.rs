//! Production lifecycle through the service, on the in-memory store with a
//! manual clock and scheduler.

use chrono::{TimeDelta, TimeZone, Utc};
use futures::future::BoxFuture;
use rts_server::{
    db::{GameStore, MemoryRepo},
    game::{
        catalog::Catalog,
        error::{Entity, GameError},
        service::GameService,
        ticker,
        types::{
            ActionKind, BuildingType, GameAction, GameState, GameStatus, Resource,
            UnitProduction, UnitType,
        },
    },
    scheduler::{Clock, ManualClock, ManualScheduler},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

struct Harness {
    svc: GameService,
    repo: MemoryRepo,
    scheduler: Arc<ManualScheduler>,
    clock: Arc<ManualClock>,
}

/// Memory store whose document writes can be switched off.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryRepo,
    fail_game_writes: Arc<AtomicBool>,
    fail_production_writes: Arc<AtomicBool>,
}

fn down<'a>() -> BoxFuture<'a, anyhow::Result<()>> {
    Box::pin(async { Err(anyhow::anyhow!("down")) })
}

impl GameStore for FlakyStore {
    fn load_game<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<GameState>>> {
        self.inner.load_game(id)
    }

    fn save_game<'a>(&'a self, state: &'a GameState) -> BoxFuture<'a, anyhow::Result<()>> {
        if self.fail_game_writes.load(Ordering::SeqCst) {
            return down();
        }
        self.inner.save_game(state)
    }

    fn list_games(&self, limit: usize) -> BoxFuture<'_, anyhow::Result<Vec<GameState>>> {
        self.inner.list_games(limit)
    }

    fn append_action<'a>(&'a self, action: &'a GameAction) -> BoxFuture<'a, anyhow::Result<()>> {
        self.inner.append_action(action)
    }

    fn load_production<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<UnitProduction>>> {
        self.inner.load_production(id)
    }

    fn save_production<'a>(
        &'a self,
        production: &'a UnitProduction,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        if self.fail_production_writes.load(Ordering::SeqCst) {
            return down();
        }
        self.inner.save_production(production)
    }

    fn list_productions<'a>(
        &'a self,
        game_id: &'a str,
        completed: bool,
    ) -> BoxFuture<'a, anyhow::Result<Vec<UnitProduction>>> {
        self.inner.list_productions(game_id, completed)
    }

    fn ping(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        self.inner.ping()
    }
}

fn flaky_service(store: &FlakyStore) -> (GameService, Arc<ManualScheduler>) {
    let scheduler = Arc::new(ManualScheduler::new());
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let svc = GameService::new(
        Arc::new(store.clone()),
        scheduler.clone(),
        Arc::new(ManualClock::new(start)),
        Arc::new(Catalog::standard()),
        Some(7),
    );
    (svc, scheduler)
}

fn harness() -> Harness {
    let repo = MemoryRepo::new();
    let scheduler = Arc::new(ManualScheduler::new());
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let svc = GameService::new(
        Arc::new(repo.clone()),
        scheduler.clone(),
        clock.clone(),
        Arc::new(Catalog::standard()),
        Some(7),
    );
    Harness {
        svc,
        repo,
        scheduler,
        clock,
    }
}

#[tokio::test]
async fn produced_unit_arrives_once_at_end_time() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();

    let prod = h
        .svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap();
    assert!(!prod.completed);
    assert_eq!(prod.end_time - prod.start_time, TimeDelta::milliseconds(3000));
    assert_eq!(h.scheduler.deadlines(), vec![prod.end_time]);

    // Paid up front
    let paid = h.svc.get_game(&game.id).await.unwrap();
    assert_eq!(paid.player.resources.get(Resource::Gold), 450);
    assert_eq!(paid.player.resources.get(Resource::Food), 99);
    assert_eq!(paid.player.units.len(), 3);

    // Not due yet
    assert_eq!(h.scheduler.run_due(h.clock.now()).await, 0);
    assert_eq!(h.svc.pending_productions(&game.id).await.unwrap().len(), 1);

    h.clock.advance(TimeDelta::seconds(3));
    assert_eq!(h.scheduler.run_due(h.clock.now()).await, 1);

    let done = h.svc.get_game(&game.id).await.unwrap();
    assert_eq!(done.player.units.len(), 4);
    let peasant = done.player.units.last().unwrap();
    assert_eq!(peasant.kind, UnitType::Peasant);
    assert_eq!((peasant.x, peasant.y), (6, 6));
    assert_eq!(peasant.health, 50);
    assert!(h.svc.pending_productions(&game.id).await.unwrap().is_empty());

    // Second completion is refused and adds nothing
    let err = h.svc.complete_production(&prod.id).await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyCompleted));
    assert_eq!(h.svc.get_game(&game.id).await.unwrap().player.units.len(), 4);
}

#[tokio::test]
async fn completion_fails_cleanly_when_building_is_gone() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();
    let prod = h
        .svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap();

    let mut razed = h.svc.get_game(&game.id).await.unwrap();
    razed.player.buildings.clear();
    h.repo.save_game(&razed).await.unwrap();

    let err = h.svc.complete_production(&prod.id).await.unwrap_err();
    assert!(matches!(err, GameError::NotFound(Entity::Building, _)));

    let after = h.svc.get_game(&game.id).await.unwrap();
    assert_eq!(after.player.units.len(), 3);
    let stored = h.repo.load_production(&prod.id).await.unwrap().unwrap();
    assert!(!stored.completed);

    // The scheduled path swallows the same failure.
    h.clock.advance(TimeDelta::seconds(10));
    assert_eq!(h.scheduler.run_due(h.clock.now()).await, 1);
}

#[tokio::test]
async fn town_hall_cannot_train_soldiers() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();

    let err = h
        .svc
        .produce_unit(&game.id, "building1", UnitType::Soldier)
        .await
        .unwrap_err();

    assert!(matches!(err, GameError::CannotProduce));
    assert_eq!(h.scheduler.pending(), 0);
    let state = h.svc.get_game(&game.id).await.unwrap();
    assert_eq!(state.player.resources.get(Resource::Gold), 500);
}

#[tokio::test]
async fn production_stops_when_funds_run_out() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();
    let state = h.svc.build(&game.id, BuildingType::Barracks, 9, 9).await.unwrap();
    let barracks = state.player.buildings.last().unwrap().id.clone();

    // 300 gold / 150 wood left; archers cost 120 gold + 50 wood
    for _ in 0..2 {
        h.svc
            .produce_unit(&game.id, &barracks, UnitType::Archer)
            .await
            .unwrap();
    }
    let err = h
        .svc
        .produce_unit(&game.id, &barracks, UnitType::Archer)
        .await
        .unwrap_err();

    assert!(matches!(err, GameError::InsufficientResources(Resource::Gold)));
    let state = h.svc.get_game(&game.id).await.unwrap();
    assert_eq!(state.player.resources.get(Resource::Gold), 60);
    assert_eq!(state.player.resources.get(Resource::Wood), 50);
    assert_eq!(h.svc.pending_productions(&game.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();

    let err = h
        .svc
        .produce_unit("nope", "building1", UnitType::Peasant)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotFound(Entity::Game, _)));

    let err = h
        .svc
        .produce_unit(&game.id, "enemy_building1", UnitType::Peasant)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotFound(Entity::Building, _)));

    let err = h.svc.complete_production("nope").await.unwrap_err();
    assert!(matches!(err, GameError::NotFound(Entity::Production, _)));
}

#[tokio::test]
async fn commands_leave_an_audit_trail_and_refresh_timestamp() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();
    h.clock.advance(TimeDelta::seconds(1));

    h.svc
        .move_units(&game.id, &["unit1".to_string()], 3, 3)
        .await
        .unwrap();
    h.svc.attack(&game.id, "unit3", "enemy_unit1").await.unwrap();
    h.svc.build(&game.id, BuildingType::Farm, 8, 6).await.unwrap();
    h.svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap();
    let state = h.svc.update_resources(&game.id).await.unwrap();

    let kinds: Vec<ActionKind> = h
        .repo
        .actions(&game.id)
        .iter()
        .map(|a| a.action_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ActionKind::Move,
            ActionKind::Attack,
            ActionKind::Build,
            ActionKind::Produce
        ]
    );
    assert_eq!(state.updated_at, game.created_at + TimeDelta::seconds(1));
    assert_eq!(state.created_at, game.created_at);
}

#[tokio::test]
async fn failed_command_persists_nothing() {
    let h = harness();
    let game = h.svc.create_game("Alice").await.unwrap();

    let err = h
        .svc
        .build(&game.id, BuildingType::Farm, 15, 15)
        .await
        .unwrap_err();

    assert!(matches!(err, GameError::PositionOccupied { x: 15, y: 15 }));
    assert_eq!(h.svc.get_game(&game.id).await.unwrap(), game);
    assert!(h.repo.actions(&game.id).is_empty());
}

#[tokio::test]
async fn produce_keeps_funds_when_order_cannot_be_stored() {
    let store = FlakyStore::default();
    let (svc, scheduler) = flaky_service(&store);
    let game = svc.create_game("Alice").await.unwrap();

    store.fail_production_writes.store(true, Ordering::SeqCst);
    let err = svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::Storage(_)));

    let state = svc.get_game(&game.id).await.unwrap();
    assert_eq!(state.player.resources.get(Resource::Gold), 500);
    assert_eq!(state.player.resources.get(Resource::Food), 100);
    assert!(svc.pending_productions(&game.id).await.unwrap().is_empty());
    assert_eq!(scheduler.pending(), 0);
    assert!(store.inner.actions(&game.id).is_empty());
}

#[tokio::test]
async fn completion_can_be_retried_after_game_write_fails() {
    let store = FlakyStore::default();
    let (svc, _scheduler) = flaky_service(&store);
    let game = svc.create_game("Alice").await.unwrap();
    let prod = svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap();

    store.fail_game_writes.store(true, Ordering::SeqCst);
    let err = svc.complete_production(&prod.id).await.unwrap_err();
    assert!(matches!(err, GameError::Storage(_)));
    let stored = store.inner.load_production(&prod.id).await.unwrap().unwrap();
    assert!(!stored.completed);

    store.fail_game_writes.store(false, Ordering::SeqCst);
    let done = svc.complete_production(&prod.id).await.unwrap();
    assert_eq!(done.player.units.len(), 4);
    let stored = store.inner.load_production(&prod.id).await.unwrap().unwrap();
    assert!(stored.completed);
}

#[tokio::test]
async fn completion_rolls_back_unit_when_order_cannot_be_closed() {
    let store = FlakyStore::default();
    let (svc, _scheduler) = flaky_service(&store);
    let game = svc.create_game("Alice").await.unwrap();
    let prod = svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap();

    store.fail_production_writes.store(true, Ordering::SeqCst);
    let err = svc.complete_production(&prod.id).await.unwrap_err();
    assert!(matches!(err, GameError::Storage(_)));
    assert_eq!(svc.get_game(&game.id).await.unwrap().player.units.len(), 3);

    store.fail_production_writes.store(false, Ordering::SeqCst);
    let done = svc.complete_production(&prod.id).await.unwrap();
    assert_eq!(done.player.units.len(), 4);
}

#[tokio::test]
async fn game_locks_are_released_after_use() {
    let h = harness();
    for i in 0..100 {
        let err = h.svc.update_resources(&format!("nope-{i}")).await.unwrap_err();
        assert!(matches!(err, GameError::NotFound(Entity::Game, _)));
    }
    assert_eq!(h.svc.locked_games(), 0);

    let game = h.svc.create_game("Alice").await.unwrap();
    let prod = h
        .svc
        .produce_unit(&game.id, "building1", UnitType::Peasant)
        .await
        .unwrap();
    h.svc.complete_production(&prod.id).await.unwrap();
    assert_eq!(h.svc.locked_games(), 0);
}

#[tokio::test]
async fn seeded_ai_turns_are_reproducible() {
    let a = harness();
    let b = harness();
    let mut ga = a.svc.create_game("Alice").await.unwrap();
    let mut gb = b.svc.create_game("Alice").await.unwrap();

    for _ in 0..10 {
        ga = a.svc.ai_turn(&ga.id).await.unwrap();
        gb = b.svc.ai_turn(&gb.id).await.unwrap();
    }

    let positions = |g: &rts_server::game::types::GameState| {
        g.enemy.units.iter().map(|u| (u.x, u.y)).collect::<Vec<_>>()
    };
    assert_eq!(positions(&ga), positions(&gb));
}

#[tokio::test]
async fn ticker_advances_every_playing_game() {
    let h = harness();
    let a = h.svc.create_game("Alice").await.unwrap();
    let b = h.svc.create_game("Bob").await.unwrap();

    let mut paused = h.svc.get_game(&b.id).await.unwrap();
    paused.game_status = GameStatus::Paused;
    h.repo.save_game(&paused).await.unwrap();

    assert_eq!(ticker::tick(&h.svc).await, 1);

    // town hall income only reaches the playing game
    let a = h.svc.get_game(&a.id).await.unwrap();
    let b = h.svc.get_game(&b.id).await.unwrap();
    assert_eq!(a.player.resources.get(Resource::Gold), 501);
    assert_eq!(b.player.resources.get(Resource::Gold), 500);
}
