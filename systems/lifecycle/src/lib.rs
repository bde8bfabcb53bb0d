#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session lifecycle rules: opening, building and ending dungeon sessions.
//!
//! Every function here is a pure check over snapshots and views. Accepted
//! requests are expressed as [`Command`] values for the world to apply.

use dungeon_core::{
    Command, EngineError, HeroId, PartyView, SessionId, SessionSnapshot, SessionStatus,
    TileView, Timestamp,
};

/// Refuses to open a session for a hero already engaged in an active one.
pub fn check_can_open(hero: &HeroId, engagement: Option<&SessionId>) -> Result<(), EngineError> {
    match engagement {
        Some(session) => Err(EngineError::AlreadyInSession {
            hero: hero.clone(),
            session: session.clone(),
        }),
        None => Ok(()),
    }
}

/// Refuses any further play in a session that reached a terminal status.
pub fn check_active(session: &SessionSnapshot) -> Result<(), EngineError> {
    if session.status.is_terminal() {
        return Err(EngineError::SessionEnded(session.id.clone()));
    }
    Ok(())
}

/// Refuses heroes outside the party.
pub fn check_member(party: PartyView<'_>, hero: &HeroId) -> Result<(), EngineError> {
    if party.contains(hero) {
        Ok(())
    } else {
        Err(EngineError::NotPartyMember(hero.clone()))
    }
}

/// Work required to bring a session's map into play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildPlan {
    seed: bool,
    start: bool,
}

impl BuildPlan {
    /// Reports whether tiles and monsters still have to be created.
    #[must_use]
    pub const fn needs_seeding(&self) -> bool {
        self.seed
    }

    /// Command moving the session to `in-progress`, if still required.
    #[must_use]
    pub fn start_command(&self, session: &SessionId, at: Timestamp) -> Option<Command> {
        self.start.then(|| Command::SetSessionStatus {
            session: session.clone(),
            status: SessionStatus::InProgress,
            at,
        })
    }
}

/// Decides what a build request must do; building a built session is a no-op.
pub fn plan_build(session: &SessionSnapshot, tiles: TileView<'_>) -> Result<BuildPlan, EngineError> {
    check_active(session)?;
    Ok(BuildPlan {
        seed: tiles.is_empty(),
        start: session.status == SessionStatus::Created,
    })
}

/// Outcome of a request to end a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndPlan {
    /// The owner ends the session for everyone.
    TearDown(SessionStatus),
    /// A member leaves; the session keeps running.
    Leave,
}

impl EndPlan {
    /// Emits the commands carrying out the plan.
    pub fn commands(
        &self,
        session: &SessionId,
        acting: &HeroId,
        at: Timestamp,
        out: &mut Vec<Command>,
    ) {
        match *self {
            Self::TearDown(status) => {
                out.push(Command::SetSessionStatus {
                    session: session.clone(),
                    status,
                    at,
                });
                out.push(Command::TearDownSession {
                    session: session.clone(),
                });
            }
            Self::Leave => out.push(Command::ReleaseHero {
                session: session.clone(),
                hero: acting.clone(),
            }),
        }
    }
}

/// Validates an end request and decides between teardown and leaving.
pub fn plan_end(
    session: &SessionSnapshot,
    party: PartyView<'_>,
    acting: &HeroId,
    status: SessionStatus,
) -> Result<EndPlan, EngineError> {
    check_member(party, acting)?;
    check_active(session)?;
    if !status.is_terminal() {
        return Err(EngineError::InvalidTransition {
            from: session.status,
            to: status,
        });
    }

    if party.is_owner(acting) {
        Ok(EndPlan::TearDown(status))
    } else {
        Ok(EndPlan::Leave)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dungeon_core::{Difficulty, DungeonId, GridDimensions, MapId};

    use super::*;

    fn snapshot(status: SessionStatus) -> SessionSnapshot {
        SessionSnapshot {
            id: SessionId::new("s"),
            dungeon: DungeonId::new("d"),
            map: MapId::new("m"),
            owner: HeroId::new("owner"),
            difficulty: Difficulty::Normal,
            duration: Duration::from_secs(60),
            status,
            created_at: Timestamp::from_millis(0),
            ended_at: None,
            grid: GridDimensions {
                width: 1,
                height: 1,
                tile_width: 32,
                tile_height: 32,
            },
        }
    }

    #[test]
    fn engaged_hero_cannot_open_another_session() {
        let hero = HeroId::new("owner");
        let session = SessionId::new("s");
        let error = check_can_open(&hero, Some(&session)).expect_err("conflict");
        assert_eq!(error.kind(), dungeon_core::ErrorKind::Conflict);
        assert!(error.to_string().starts_with("A dungeon session is already in progress"));
        assert!(check_can_open(&hero, None).is_ok());
    }

    #[test]
    fn owner_tears_down_and_member_leaves() {
        let owner = HeroId::new("owner");
        let guest = HeroId::new("guest");
        let members = vec![owner.clone(), guest.clone()];
        let party = PartyView::new(&owner, &members);
        let session = snapshot(SessionStatus::InProgress);

        assert_eq!(
            plan_end(&session, party, &owner, SessionStatus::Completed),
            Ok(EndPlan::TearDown(SessionStatus::Completed))
        );
        assert_eq!(
            plan_end(&session, party, &guest, SessionStatus::Abandoned),
            Ok(EndPlan::Leave)
        );
    }

    #[test]
    fn end_requests_are_validated() {
        let owner = HeroId::new("owner");
        let members = vec![owner.clone()];
        let party = PartyView::new(&owner, &members);

        assert_eq!(
            plan_end(
                &snapshot(SessionStatus::InProgress),
                party,
                &HeroId::new("stranger"),
                SessionStatus::Completed
            ),
            Err(EngineError::NotPartyMember(HeroId::new("stranger")))
        );
        assert_eq!(
            plan_end(
                &snapshot(SessionStatus::InProgress),
                party,
                &owner,
                SessionStatus::Created
            ),
            Err(EngineError::InvalidTransition {
                from: SessionStatus::InProgress,
                to: SessionStatus::Created,
            })
        );
        assert_eq!(
            plan_end(
                &snapshot(SessionStatus::Failed),
                party,
                &owner,
                SessionStatus::Completed
            ),
            Err(EngineError::SessionEnded(SessionId::new("s")))
        );
    }

    #[test]
    fn building_an_ended_session_is_refused() {
        let tiles = Vec::new();
        let result = plan_build(&snapshot(SessionStatus::Abandoned), TileView::new(&tiles));
        assert!(matches!(result, Err(EngineError::SessionEnded(_))));

        let plan = plan_build(&snapshot(SessionStatus::Created), TileView::new(&tiles))
            .expect("buildable");
        assert!(plan.needs_seeding());
        assert!(plan.start_command(&SessionId::new("s"), Timestamp::from_millis(5)).is_some());
    }
}
