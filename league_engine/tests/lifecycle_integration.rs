//! Lifecycle integration tests: the tournament state machine driven through
//! `CompetitionManager`, with audit and notification side effects.

mod common;

use chrono::{Duration, Utc};
use common::{FIRST_PLAYER, Harness, OWNER};
use league_engine::{
    CompetitionError, ErrorClass,
    authz::AdminRole,
    notify::CompetitionEvent,
    roster::{PaymentState, RegistrationStatus, TeamStatus},
    tournament::{FormationMode, TournamentConfig, TournamentStatus, Transition},
};

#[tokio::test]
async fn test_full_lifecycle_is_audited() {
    let mut h = Harness::new();
    let config = TournamentConfig::single_elimination("Autumn Cup".to_string(), 8);
    let id = h.closed_tournament(config, 4).await;

    let set = h.manager.start_tournament(OWNER, id).await.unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(
        h.manager.get_tournament(id).await.unwrap().status,
        TournamentStatus::InProgress
    );

    let played = h.play_out(id, |_| (3, 1)).await;
    assert_eq!(played, 3);

    let standings = h.manager.complete_tournament(OWNER, id).await.unwrap();
    assert!(standings.is_resolved());
    let tournament = h.manager.get_tournament(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
    assert!(tournament.completed_at.is_some());

    for action in [
        "tournament.create",
        "tournament.publish",
        "tournament.close_registration",
        "bracket.generate",
        "tournament.complete",
    ] {
        assert!(
            !h.audit.with_action(action).await.is_empty(),
            "missing audit entry for {action}"
        );
    }
    assert_eq!(h.audit.with_action("match.score").await.len(), 3);
    assert!(h.audit.entries().await.iter().all(|e| e.tournament_id == id));

    let transitions: Vec<(TournamentStatus, TournamentStatus)> = h
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            CompetitionEvent::StatusChanged { from, to, .. } => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (TournamentStatus::Draft, TournamentStatus::Open),
            (TournamentStatus::Open, TournamentStatus::Closed),
            (TournamentStatus::Closed, TournamentStatus::InProgress),
            (TournamentStatus::InProgress, TournamentStatus::Completed),
        ]
    );
}

#[tokio::test]
async fn test_version_increments_per_commit() {
    let h = Harness::new();
    let config = TournamentConfig::round_robin("League".to_string(), 4, 1);
    let created = h.manager.create_tournament(OWNER, config).await.unwrap();
    let published = h.manager.publish_tournament(OWNER, created.id).await.unwrap();
    assert_eq!(published.version, created.version + 1);
    assert_eq!(
        h.manager.get_tournament(created.id).await.unwrap().version,
        published.version
    );
}

#[tokio::test]
async fn test_invalid_transition_leaves_state_untouched() {
    let h = Harness::new();
    let config = TournamentConfig::single_elimination("Cup".to_string(), 8);
    let tournament = h.manager.create_tournament(OWNER, config).await.unwrap();

    let err = h
        .manager
        .start_tournament(OWNER, tournament.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CompetitionError::InvalidStateTransition {
            attempted: Transition::Start,
            current: TournamentStatus::Draft,
        }
    ));
    assert_eq!(err.class(), ErrorClass::FixInput);

    let after = h.manager.get_tournament(tournament.id).await.unwrap();
    assert_eq!(after, tournament);
}

#[tokio::test]
async fn test_roles_gate_organizer_operations() {
    let h = Harness::new();
    let config = TournamentConfig::single_elimination("Cup".to_string(), 8);
    let id = h.manager.create_tournament(OWNER, config).await.unwrap().id;

    let err = h.manager.publish_tournament(42, id).await.unwrap_err();
    assert!(matches!(err, CompetitionError::Unauthorized { user_id: 42, .. }));
    assert_eq!(err.class(), ErrorClass::Forbidden);

    h.authorizer.grant(id, 42, AdminRole::Admin).await;
    h.manager.publish_tournament(42, id).await.unwrap();

    h.authorizer.grant(id, 43, AdminRole::Scorekeeper).await;
    assert!(matches!(
        h.manager.close_registration(43, id).await,
        Err(CompetitionError::Unauthorized { .. })
    ));

    h.authorizer.revoke(id, 42).await;
    assert!(h.manager.close_registration(42, id).await.is_err());
}

#[tokio::test]
async fn test_elapsed_deadline_closes_registration_first() {
    let h = Harness::new();
    let mut config = TournamentConfig::single_elimination("Cup".to_string(), 8);
    config.registration_deadline = Some(Utc::now() - Duration::hours(1));
    let id = h.manager.create_tournament(OWNER, config).await.unwrap().id;
    h.manager.publish_tournament(OWNER, id).await.unwrap();

    let err = h
        .manager
        .register(FIRST_PLAYER, id, FIRST_PLAYER, None, PaymentState::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CompetitionError::InvalidStateTransition {
            attempted: Transition::Register,
            current: TournamentStatus::Closed,
        }
    ));

    let tournament = h.manager.get_tournament(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Closed);
    assert_eq!(
        h.audit
            .with_action("tournament.close_registration.deadline")
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn test_postpone_shifts_dates_and_resume_restores_status() {
    let h = Harness::new();
    let start = Utc::now() + Duration::days(7);
    let mut config = TournamentConfig::round_robin("League".to_string(), 4, 1);
    config.start_date = Some(start);
    config.end_date = Some(start + Duration::days(2));
    let id = h.manager.create_tournament(OWNER, config).await.unwrap().id;
    h.manager.publish_tournament(OWNER, id).await.unwrap();

    let new_start = start + Duration::days(14);
    let postponed = h
        .manager
        .postpone_tournament(OWNER, id, new_start)
        .await
        .unwrap();
    assert_eq!(postponed.status, TournamentStatus::Postponed);
    assert_eq!(postponed.postponed_from, Some(TournamentStatus::Open));
    assert_eq!(postponed.config.start_date, Some(new_start));
    assert_eq!(postponed.config.end_date, Some(new_start + Duration::days(2)));

    assert!(
        h.manager
            .register(FIRST_PLAYER, id, FIRST_PLAYER, None, PaymentState::default())
            .await
            .is_err()
    );

    let resumed = h.manager.resume_tournament(OWNER, id).await.unwrap();
    assert_eq!(resumed.status, TournamentStatus::Open);
    assert_eq!(resumed.postponed_from, None);
    h.manager
        .register(FIRST_PLAYER, id, FIRST_PLAYER, None, PaymentState::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_is_terminal() {
    let h = Harness::new();
    let config = TournamentConfig::single_elimination("Cup".to_string(), 8);
    let id = h.closed_tournament(config, 4).await;
    h.manager.start_tournament(OWNER, id).await.unwrap();

    let cancelled = h.manager.cancel_tournament(OWNER, id).await.unwrap();
    assert_eq!(cancelled.status, TournamentStatus::Cancelled);
    assert!(h.manager.cancel_tournament(OWNER, id).await.is_err());
    assert!(h.manager.resume_tournament(OWNER, id).await.is_err());

    let m = h.manager.list_matches(id).await.unwrap().matches[0].clone();
    assert!(h.manager.enter_score(OWNER, id, m.id, 1, 0).await.is_err());
}

#[tokio::test]
async fn test_pre_formed_teams_and_waitlist() {
    let mut h = Harness::new();
    let mut config = TournamentConfig::single_elimination("Cup".to_string(), 2)
        .with_formation(FormationMode::PreFormed)
        .with_team_size(1, 2);
    config.max_participants = Some(4);
    let id = h.manager.create_tournament(OWNER, config).await.unwrap().id;
    h.manager.publish_tournament(OWNER, id).await.unwrap();

    let mut teams = Vec::new();
    for (captain, name) in [(10, "Hawks"), (11, "Owls"), (12, "Crows")] {
        h.manager
            .register(captain, id, captain, None, PaymentState::default())
            .await
            .unwrap();
        teams.push(
            h.manager
                .create_team(captain, id, name, Some(captain))
                .await
                .unwrap(),
        );
    }
    assert_eq!(teams[0].status, TeamStatus::Registered);
    assert_eq!(teams[1].status, TeamStatus::Registered);
    assert_eq!(teams[2].status, TeamStatus::Waitlisted);
    assert_eq!(teams[2].waitlist_position, Some(1));

    // Captains joined on team creation; a teammate joins with their own registration
    let mate = h
        .manager
        .register(20, id, 20, Some(3), PaymentState::default())
        .await
        .unwrap();
    let joined = h
        .manager
        .assign_team(20, id, mate.id, teams[0].id)
        .await
        .unwrap();
    assert_eq!(joined.team_id, Some(teams[0].id));

    let extra = h
        .manager
        .register(21, id, 21, None, PaymentState::default())
        .await
        .unwrap();
    assert_eq!(extra.status, RegistrationStatus::Waitlisted);

    h.drain_events();
    h.manager.withdraw_team(11, id, teams[1].id).await.unwrap();
    let competition = h.manager.get_competition(id).await.unwrap();
    assert_eq!(
        competition.team(teams[2].id).unwrap().status,
        TeamStatus::Registered
    );
    assert!(h.drain_events().iter().any(|e| matches!(
        e,
        CompetitionEvent::TeamPromoted { team_id, .. } if *team_id == teams[2].id
    )));
}
