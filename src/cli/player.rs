use crate::{
    cli::{Session, fail},
    info,
    spotify::Player,
    success, utils,
};

pub async fn play(session: &Session, uri: &str) {
    match Player::new(session.gateway.clone()).play_context(uri).await {
        Ok(()) => success!("Playing {}", uri),
        Err(e) => fail(e),
    }
}

pub async fn resume(session: &Session) {
    match Player::new(session.gateway.clone()).resume().await {
        Ok(()) => success!("Resumed"),
        Err(e) => fail(e),
    }
}

pub async fn pause(session: &Session) {
    match Player::new(session.gateway.clone()).pause().await {
        Ok(()) => success!("Paused"),
        Err(e) => fail(e),
    }
}

pub async fn next(session: &Session) {
    if let Err(e) = Player::new(session.gateway.clone()).next().await {
        fail(e)
    }
}

pub async fn previous(session: &Session) {
    if let Err(e) = Player::new(session.gateway.clone()).previous().await {
        fail(e)
    }
}

pub async fn now_playing(session: &Session) {
    let playing = match Player::new(session.gateway.clone()).currently_playing().await {
        Ok(p) => p,
        Err(e) => fail(e),
    };

    match playing.and_then(|p| p.item.map(|item| (p.is_playing, p.progress_ms, item))) {
        Some((is_playing, progress_ms, item)) => {
            let artists = item
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            info!(
                "{} {} - {} [{} / {}]",
                if is_playing { "▶" } else { "⏸" },
                artists,
                item.name,
                utils::format_duration_ms(progress_ms.unwrap_or(0)),
                utils::format_duration_ms(item.duration_ms)
            );
        }
        None => info!("Nothing is playing."),
    }
}
