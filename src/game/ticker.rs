//! Optional server-side heartbeat: income and one AI turn for every game
//! still in play. Off unless `TICK_SECS` > 0.

use crate::game::{service::GameService, types::GameStatus};
use tokio::time::{sleep, Duration};

/// One pass over every stored game. Returns how many games advanced.
pub async fn tick(svc: &GameService) -> usize {
    let games = match svc.list_games().await {
        Ok(g) => g,
        Err(e) => {
            log::error!("tick: listing games failed: {e}");
            return 0;
        }
    };

    let mut advanced = 0;
    for game in games.iter().filter(|g| g.game_status == GameStatus::Playing) {
        if let Err(e) = svc.update_resources(&game.id).await {
            log::error!("tick: resources for {} failed: {e}", game.id);
            continue;
        }
        if let Err(e) = svc.ai_turn(&game.id).await {
            log::error!("tick: ai turn for {} failed: {e}", game.id);
            continue;
        }
        advanced += 1;
    }
    advanced
}

pub async fn run(svc: GameService, period: Duration) {
    loop {
        sleep(period).await;
        let n = tick(&svc).await;
        log::debug!("tick advanced {n} games");
    }
}

pub fn start(svc: GameService, secs: u64) {
    if secs == 0 {
        return;
    }
    tokio::spawn(run(svc, Duration::from_secs(secs)));
}
