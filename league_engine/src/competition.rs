//! The competition aggregate.
//!
//! A [`Competition`] is one tournament together with everything it owns:
//! teams, registrations and the match graph. It is loaded and committed as a
//! unit. Every operation here is synchronous, takes the current time from
//! the caller and records what it did into a [`Journal`] instead of writing
//! audit entries or sending notifications itself; the manager flushes the
//! journal once the aggregate has been committed.
//!
//! Operations check, in order: permission, lifecycle status, input. Nothing
//! is changed until all checks pass.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    audit::{AuditDraft, EntityKind},
    authz::Access,
    bracket::{self, Match, MatchId, MatchSet, seeding},
    errors::{CompetitionError, CompetitionResult},
    notify::CompetitionEvent,
    progression::{ProgressionEngine, ResultChange, ResultInput},
    roster::{
        AssignmentReport, PaymentState, Registration, RegistrationId, RegistrationStatus, Team,
        TeamId, TeamStatus, formation, waitlist,
    },
    standings::{self, ManualPlacement, Standings},
    tournament::{
        FormationMode, Tournament, TournamentConfig, TournamentId, TournamentStatus, Transition,
        UserId, check_transition,
    },
};

/// Audit drafts and events produced by one operation
#[derive(Debug, Default, Clone)]
pub struct Journal {
    pub entries: Vec<AuditDraft>,
    pub events: Vec<CompetitionEvent>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, draft: AuditDraft) {
        self.entries.push(draft);
    }

    pub fn notify(&mut self, event: CompetitionEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.events.is_empty()
    }

    /// Append another journal's contents
    pub fn extend(&mut self, other: Journal) {
        self.entries.extend(other.entries);
        self.events.extend(other.events);
    }
}

/// Tournament aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub tournament: Tournament,
    pub teams: Vec<Team>,
    pub registrations: Vec<Registration>,
    pub matches: Vec<Match>,
}

impl Competition {
    /// Validate a configuration and open a new draft
    pub fn create(
        owner_id: UserId,
        config: TournamentConfig,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Self> {
        config.validate()?;
        let tournament = Tournament::new(owner_id, config, now);
        journal.record(
            AuditDraft::new("tournament.create", EntityKind::Tournament, tournament.id)
                .after(&tournament)?,
        );
        info!(
            "Created tournament {} ({:?}) for owner {owner_id}",
            tournament.id, tournament.config.format
        );
        Ok(Self {
            tournament,
            teams: Vec::new(),
            registrations: Vec::new(),
            matches: Vec::new(),
        })
    }

    pub fn id(&self) -> TournamentId {
        self.tournament.id
    }

    pub fn status(&self) -> TournamentStatus {
        self.tournament.status
    }

    /// Status that governs roster rules; a postponed tournament keeps the
    /// rules of the status it was postponed from
    fn effective_status(&self) -> TournamentStatus {
        match self.tournament.status {
            TournamentStatus::Postponed => self
                .tournament
                .postponed_from
                .unwrap_or(TournamentStatus::Postponed),
            status => status,
        }
    }

    pub fn team(&self, team_id: TeamId) -> CompetitionResult<&Team> {
        self.teams
            .iter()
            .find(|t| t.id == team_id)
            .ok_or(CompetitionError::TeamNotFound(team_id))
    }

    fn team_index(&self, team_id: TeamId) -> CompetitionResult<usize> {
        self.teams
            .iter()
            .position(|t| t.id == team_id)
            .ok_or(CompetitionError::TeamNotFound(team_id))
    }

    pub fn registration(&self, registration_id: RegistrationId) -> CompetitionResult<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.id == registration_id)
            .ok_or(CompetitionError::RegistrationNotFound(registration_id))
    }

    fn registration_index(&self, registration_id: RegistrationId) -> CompetitionResult<usize> {
        self.registrations
            .iter()
            .position(|r| r.id == registration_id)
            .ok_or(CompetitionError::RegistrationNotFound(registration_id))
    }

    pub fn match_by_id(&self, match_id: MatchId) -> CompetitionResult<&Match> {
        self.matches
            .iter()
            .find(|m| m.id == match_id)
            .ok_or(CompetitionError::MatchNotFound(match_id))
    }

    /// Current match graph in stable order
    pub fn match_set(&self) -> MatchSet {
        MatchSet::new(self.matches.clone())
    }

    /// Matches without a result yet
    pub fn outstanding_matches(&self) -> usize {
        self.matches.iter().filter(|m| !m.status.is_terminal()).count()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    fn move_to(
        &mut self,
        transition: Transition,
        target: TournamentStatus,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<()> {
        let before = self.tournament.clone();
        let from = before.status;
        let t = &mut self.tournament;
        t.status = target;
        match target {
            TournamentStatus::Open => {
                t.published_at.get_or_insert(now);
            }
            TournamentStatus::Closed => {
                t.registration_closed_at.get_or_insert(now);
            }
            TournamentStatus::InProgress => {
                t.started_at.get_or_insert(now);
            }
            TournamentStatus::Completed => t.completed_at = Some(now),
            TournamentStatus::Cancelled => t.cancelled_at = Some(now),
            TournamentStatus::Postponed => t.postponed_at = Some(now),
            TournamentStatus::Draft => {}
        }
        if target != TournamentStatus::Postponed {
            t.postponed_from = None;
        }

        journal.record(
            AuditDraft::new(transition.action(), EntityKind::Tournament, t.id)
                .before(&before)?
                .after(&*t)?,
        );
        journal.notify(CompetitionEvent::StatusChanged {
            tournament_id: t.id,
            from,
            to: target,
        });
        info!("Tournament {} moved from {from} to {target}", t.id);
        Ok(())
    }

    fn fire(
        &mut self,
        transition: Transition,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<()> {
        check_transition(self.tournament.status, transition)?;
        let target = transition
            .target()
            .ok_or(CompetitionError::InvalidStateTransition {
                attempted: transition,
                current: self.tournament.status,
            })?;
        self.move_to(transition, target, now, journal)
    }

    /// Close an open tournament whose registration deadline has passed
    ///
    /// Returns whether the implied close happened.
    pub fn apply_deadline(&mut self, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<bool> {
        if self.tournament.status != TournamentStatus::Open || !self.tournament.deadline_elapsed(now) {
            return Ok(false);
        }
        let before = self.tournament.clone();
        self.tournament.status = TournamentStatus::Closed;
        self.tournament.registration_closed_at = Some(now);
        journal.record(
            AuditDraft::new(
                "tournament.close_registration.deadline",
                EntityKind::Tournament,
                self.tournament.id,
            )
            .before(&before)?
            .after(&self.tournament)?,
        );
        journal.notify(CompetitionEvent::StatusChanged {
            tournament_id: self.tournament.id,
            from: TournamentStatus::Open,
            to: TournamentStatus::Closed,
        });
        info!(
            "Registration deadline passed, tournament {} closed",
            self.tournament.id
        );
        Ok(true)
    }

    /// Draft -> Open
    pub fn publish(&mut self, access: &Access, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<()> {
        access.require_organizer(self.id(), "publish")?;
        check_transition(self.status(), Transition::Publish)?;
        self.tournament.config.validate()?;
        self.tournament.config.validate_for_publish()?;
        self.fire(Transition::Publish, now, journal)
    }

    /// Open -> Closed
    pub fn close_registration(
        &mut self,
        access: &Access,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<()> {
        access.require_organizer(self.id(), "close registration for")?;
        self.fire(Transition::CloseRegistration, now, journal)
    }

    /// Teams that enter the bracket: registered and with a full enough roster
    fn eligible(&self, team: &Team) -> bool {
        team.is_registered()
            && formation::meets_minimum(
                &self.registrations,
                team.id,
                self.tournament.config.min_players_per_team,
            )
    }

    /// Closed -> InProgress, generating the bracket in the same step
    ///
    /// Starting a tournament that is already running returns its existing
    /// matches unchanged.
    pub fn start(&mut self, access: &Access, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<MatchSet> {
        access.require_organizer(self.id(), "start")?;
        if self.status() == TournamentStatus::InProgress && !self.matches.is_empty() {
            return Ok(self.match_set());
        }
        check_transition(self.status(), Transition::Start)?;
        self.build_bracket(now, journal)
    }

    /// Generate the bracket, starting the tournament if it is still closed
    ///
    /// Idempotent like [`Competition::start`].
    pub fn generate_bracket(
        &mut self,
        access: &Access,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<MatchSet> {
        access.require_organizer(self.id(), "generate a bracket for")?;
        check_transition(self.status(), Transition::GenerateBracket)?;
        if !self.matches.is_empty() {
            return Ok(self.match_set());
        }
        self.build_bracket(now, journal)
    }

    fn build_bracket(&mut self, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<MatchSet> {
        let eligible: Vec<TeamId> = self
            .teams
            .iter()
            .filter(|t| self.eligible(t))
            .map(|t| t.id)
            .collect();
        bracket::validate_field(&self.tournament.config, eligible.len())?;

        let seeds = seeding::assign_seeds(&mut self.teams, |t| eligible.contains(&t.id));
        let set = bracket::generate(&self.tournament.config, self.tournament.id, &seeds)?;
        self.matches = set.matches.clone();

        if self.status() == TournamentStatus::Closed {
            self.move_to(Transition::Start, TournamentStatus::InProgress, now, journal)?;
        }
        journal.record(
            AuditDraft::new(
                Transition::GenerateBracket.action(),
                EntityKind::Tournament,
                self.tournament.id,
            )
            .after(&serde_json::json!({
                "seeds": seeds,
                "matches": set.matches.iter().map(|m| m.id).collect::<Vec<_>>(),
            }))?,
        );
        journal.notify(CompetitionEvent::BracketGenerated {
            tournament_id: self.tournament.id,
            matches: set.len(),
        });
        info!(
            "Generated {} matches for {} teams in tournament {}",
            set.len(),
            seeds.len(),
            self.tournament.id
        );
        Ok(set)
    }

    /// Write standings placements onto teams
    fn write_placements(&mut self, standings: &Standings) {
        for row in &standings.rows {
            if let Some(team) = self.teams.iter_mut().find(|t| t.id == row.team_id) {
                team.final_placement = row.placement;
                team.placement_manual = row.manual;
            }
        }
    }

    /// InProgress -> Completed, writing final placements
    ///
    /// Groups that no tie-breaker separates keep no placement and are
    /// returned in the standings for [`Competition::resolve_ties`].
    pub fn complete(&mut self, access: &Access, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<Standings> {
        access.require_organizer(self.id(), "complete")?;
        check_transition(self.status(), Transition::Complete)?;
        let remaining = self.outstanding_matches();
        if remaining > 0 {
            return Err(CompetitionError::MatchesOutstanding { remaining });
        }

        let standings = self.standings();
        self.write_placements(&standings);
        self.fire(Transition::Complete, now, journal)?;
        if !standings.is_resolved() {
            journal.notify(CompetitionEvent::TiesNeedResolution {
                tournament_id: self.tournament.id,
                groups: standings.tied_groups.len(),
            });
        }
        Ok(standings)
    }

    /// Any non-terminal -> Cancelled
    pub fn cancel(&mut self, access: &Access, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<()> {
        access.require_organizer(self.id(), "cancel")?;
        self.fire(Transition::Cancel, now, journal)
    }

    /// Any active status -> Postponed, moving the schedule to `new_start`
    ///
    /// The end date, when set, moves by the same amount.
    pub fn postpone(
        &mut self,
        access: &Access,
        new_start: DateTime<Utc>,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<()> {
        access.require_organizer(self.id(), "postpone")?;
        check_transition(self.status(), Transition::Postpone)?;
        let config = &mut self.tournament.config;
        if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
            config.end_date = Some(end + (new_start - start));
        }
        config.start_date = Some(new_start);
        self.tournament.postponed_from = Some(self.tournament.status);
        self.fire(Transition::Postpone, now, journal)
    }

    /// Postponed -> the status it was postponed from
    pub fn resume(&mut self, access: &Access, now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<()> {
        access.require_organizer(self.id(), "resume")?;
        check_transition(self.status(), Transition::Resume)?;
        let target = self
            .tournament
            .postponed_from
            .ok_or(CompetitionError::InvalidStateTransition {
                attempted: Transition::Resume,
                current: self.status(),
            })?;
        self.move_to(Transition::Resume, target, now, journal)
    }

    // ---------------------------------------------------------------------
    // Roster
    // ---------------------------------------------------------------------

    /// Reject roster changes once play has started
    fn roster_guard(&self) -> CompetitionResult<()> {
        let status = self.effective_status();
        match status {
            TournamentStatus::Completed | TournamentStatus::Cancelled => {
                Err(CompetitionError::RosterLocked(self.status()))
            }
            TournamentStatus::InProgress if !self.tournament.config.allow_substitutions => {
                Err(CompetitionError::RosterLocked(self.status()))
            }
            _ => Ok(()),
        }
    }

    /// New teams are only accepted before the bracket exists
    fn team_creation_guard(&self) -> CompetitionResult<()> {
        match self.effective_status() {
            TournamentStatus::Draft | TournamentStatus::Open | TournamentStatus::Closed => Ok(()),
            _ => Err(CompetitionError::RosterLocked(self.status())),
        }
    }

    fn require_mode(&self, expected: FormationMode) -> CompetitionResult<()> {
        let actual = self.tournament.config.formation_mode;
        if actual == expected {
            Ok(())
        } else {
            Err(CompetitionError::FormationModeMismatch { expected, actual })
        }
    }

    fn active_registration_of(&self, user_id: UserId) -> Option<usize> {
        self.registrations
            .iter()
            .position(|r| r.user_id == user_id && r.is_active())
    }

    /// Register `user_id`, waitlisting beyond `max_participants`
    pub fn register(
        &mut self,
        access: &Access,
        user_id: UserId,
        skill_tier: Option<u8>,
        payment_state: PaymentState,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Registration> {
        access.require_self_or_organizer(user_id, self.id(), "register for")?;
        check_transition(self.status(), Transition::Register)?;
        if self.active_registration_of(user_id).is_some() {
            return Err(CompetitionError::AlreadyRegistered(user_id));
        }

        let capacity = self.tournament.config.max_participants;
        let has_room = waitlist::has_capacity(&self.registrations, capacity);
        let sequence = self.registrations.len() as u32 + 1;
        self.registrations.push(Registration::new(
            self.tournament.id,
            user_id,
            skill_tier,
            sequence,
            payment_state,
            now,
        ));
        let index = self.registrations.len() - 1;
        if !has_room {
            waitlist::enqueue(&mut self.registrations, index);
        }

        let registration = self.registrations[index].clone();
        journal.record(
            AuditDraft::new(
                Transition::Register.action(),
                EntityKind::Registration,
                registration.id,
            )
            .after(&registration)?,
        );
        info!(
            "User {user_id} registered for tournament {} ({})",
            self.tournament.id,
            registration.status.as_str()
        );
        Ok(registration)
    }

    /// Withdraw a registration and promote from the waitlist
    pub fn withdraw_registration(
        &mut self,
        access: &Access,
        registration_id: RegistrationId,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Registration> {
        let index = self.registration_index(registration_id)?;
        let user_id = self.registrations[index].user_id;
        access.require_self_or_organizer(user_id, self.id(), "withdraw from")?;
        if !self.registrations[index].is_active() {
            return Err(CompetitionError::InvalidRosterOperation(format!(
                "registration {registration_id} is already withdrawn"
            )));
        }
        if self.registrations[index].team_id.is_some() {
            self.roster_guard()?;
        } else if self.effective_status().is_terminal() {
            return Err(CompetitionError::RosterLocked(self.status()));
        }

        let before = self.registrations[index].clone();
        let registration = &mut self.registrations[index];
        registration.status = RegistrationStatus::Withdrawn;
        registration.team_id = None;
        registration.waitlist_position = None;
        let after = registration.clone();
        journal.record(
            AuditDraft::new("registration.withdraw", EntityKind::Registration, registration_id)
                .before(&before)?
                .after(&after)?,
        );

        self.promote_from_waitlist(now, journal)?;
        Ok(after)
    }

    /// Fill freed slots from the registration and team waitlists
    ///
    /// Returns how many entries were promoted.
    pub fn promote_from_waitlist(&mut self, _now: DateTime<Utc>, journal: &mut Journal) -> CompetitionResult<usize> {
        let tournament_id = self.tournament.id;
        let mut promoted = 0;

        let capacity = self.tournament.config.max_participants;
        for index in waitlist::promote(&mut self.registrations, capacity, |_| true) {
            let registration = &self.registrations[index];
            journal.record(
                AuditDraft::new("registration.promote", EntityKind::Registration, registration.id)
                    .after(registration)?,
            );
            journal.notify(CompetitionEvent::RegistrationPromoted {
                tournament_id,
                registration_id: registration.id,
            });
            info!(
                "Promoted registration {} from the waitlist of tournament {tournament_id}",
                registration.id
            );
            promoted += 1;
        }

        let pre_formed = self.tournament.config.formation_mode == FormationMode::PreFormed;
        let min_players = self.tournament.config.min_players_per_team;
        let registrations = &self.registrations;
        let team_capacity = Some(self.tournament.config.max_teams);
        for index in waitlist::promote(&mut self.teams, team_capacity, |team| {
            !pre_formed || formation::meets_minimum(registrations, team.id, min_players)
        }) {
            let team = &self.teams[index];
            journal.record(AuditDraft::new("team.promote", EntityKind::Team, team.id).after(team)?);
            journal.notify(CompetitionEvent::TeamPromoted {
                tournament_id,
                team_id: team.id,
            });
            info!(
                "Promoted team {} from the waitlist of tournament {tournament_id}",
                team.id
            );
            promoted += 1;
        }
        Ok(promoted)
    }

    fn push_team(&mut self, name: String, captain_user_id: Option<UserId>, now: DateTime<Utc>) -> usize {
        let has_room = waitlist::has_capacity(&self.teams, Some(self.tournament.config.max_teams));
        let sequence = self.teams.len() as u32 + 1;
        self.teams.push(Team::new(
            self.tournament.id,
            name,
            captain_user_id,
            sequence,
            now,
        ));
        let index = self.teams.len() - 1;
        if !has_room {
            waitlist::enqueue(&mut self.teams, index);
        }
        index
    }

    fn check_team_name(&self, name: &str) -> CompetitionResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CompetitionError::InvalidRosterOperation(
                "team name must not be empty".to_string(),
            ));
        }
        let taken = self
            .teams
            .iter()
            .filter(|t| t.status != TeamStatus::Withdrawn)
            .any(|t| t.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(CompetitionError::InvalidRosterOperation(format!(
                "team name {name:?} is already taken"
            )));
        }
        Ok(name.to_string())
    }

    /// Create a team; beyond `max_teams` it joins the team waitlist
    ///
    /// Organizers may create teams in either mode. In pre-formed mode a
    /// participant may create a team, becomes its captain, and is placed on
    /// it when they hold an unassigned registration.
    pub fn create_team(
        &mut self,
        access: &Access,
        name: &str,
        captain_user_id: Option<UserId>,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Team> {
        let captain = if access.is_organizer() {
            captain_user_id
        } else {
            self.require_mode(FormationMode::PreFormed)
                .map_err(|_| CompetitionError::Unauthorized {
                    user_id: access.actor,
                    tournament_id: self.tournament.id,
                    action: "create a team in",
                })?;
            Some(access.actor)
        };
        self.team_creation_guard()?;
        let name = self.check_team_name(name)?;

        let index = self.push_team(name, captain, now);
        let team_id = self.teams[index].id;
        if let Some(captain) = captain {
            if let Some(reg) = self.active_registration_of(captain) {
                let registration = &mut self.registrations[reg];
                if registration.status == RegistrationStatus::Confirmed && registration.team_id.is_none() {
                    registration.team_id = Some(team_id);
                }
            }
        }

        let team = self.teams[index].clone();
        journal.record(AuditDraft::new("team.create", EntityKind::Team, team.id).after(&team)?);
        info!(
            "Team {:?} created in tournament {} ({})",
            team.name,
            self.tournament.id,
            team.status.as_str()
        );
        Ok(team)
    }

    /// Create `count` teams named `"{prefix} N"`
    pub fn bulk_create_teams(
        &mut self,
        access: &Access,
        count: u32,
        prefix: &str,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Vec<Team>> {
        access.require_organizer(self.id(), "create teams in")?;
        self.require_mode(FormationMode::OrganizerAssigned)?;
        self.team_creation_guard()?;
        if count == 0 {
            return Err(CompetitionError::InvalidRosterOperation(
                "team count must be positive".to_string(),
            ));
        }
        let max_teams = self.tournament.config.max_teams;
        if waitlist::occupied(&self.teams) + count as usize > max_teams as usize {
            return Err(CompetitionError::TeamCapacityReached(max_teams));
        }

        let names = formation::bulk_team_names(prefix, self.teams.len(), count);
        for name in &names {
            self.check_team_name(name)?;
        }
        let mut created = Vec::with_capacity(names.len());
        for name in names {
            let index = self.push_team(name, None, now);
            let team = self.teams[index].clone();
            journal.record(AuditDraft::new("team.create", EntityKind::Team, team.id).after(&team)?);
            created.push(team);
        }
        info!(
            "Created {count} teams in tournament {}",
            self.tournament.id
        );
        Ok(created)
    }

    /// Withdraw a team, releasing its players and promoting a waitlisted team
    pub fn withdraw_team(
        &mut self,
        access: &Access,
        team_id: TeamId,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Team> {
        let index = self.team_index(team_id)?;
        let is_captain = self.teams[index].captain_user_id == Some(access.actor);
        if !is_captain {
            access.require_organizer(self.id(), "withdraw a team from")?;
        }
        if self.teams[index].status == TeamStatus::Withdrawn {
            return Err(CompetitionError::InvalidRosterOperation(format!(
                "team {team_id} is already withdrawn"
            )));
        }
        self.roster_guard()?;
        if self.matches.iter().any(|m| m.involves(team_id)) {
            return Err(CompetitionError::InvalidRosterOperation(format!(
                "team {team_id} already appears in the bracket"
            )));
        }

        let before = self.teams[index].clone();
        let team = &mut self.teams[index];
        team.status = TeamStatus::Withdrawn;
        team.waitlist_position = None;
        team.seed = None;
        let after = team.clone();
        for registration in self
            .registrations
            .iter_mut()
            .filter(|r| r.team_id == Some(team_id))
        {
            registration.team_id = None;
        }
        journal.record(
            AuditDraft::new("team.withdraw", EntityKind::Team, team_id)
                .before(&before)?
                .after(&after)?,
        );
        info!(
            "Team {team_id} withdrawn from tournament {}",
            self.tournament.id
        );

        waitlist::renumber(&mut self.teams);
        self.promote_from_waitlist(now, journal)?;
        Ok(after)
    }

    /// Put a registration on a team
    ///
    /// Organizers may assign anyone in either mode. In pre-formed mode a
    /// participant may join a team with their own registration.
    pub fn assign_team(
        &mut self,
        access: &Access,
        registration_id: RegistrationId,
        team_id: TeamId,
        _now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Registration> {
        let reg_index = self.registration_index(registration_id)?;
        if !access.is_organizer() {
            access.require_self_or_organizer(
                self.registrations[reg_index].user_id,
                self.id(),
                "join a team in",
            )?;
            self.require_mode(FormationMode::PreFormed)?;
        }
        self.roster_guard()?;

        let registration = &self.registrations[reg_index];
        if registration.status != RegistrationStatus::Confirmed {
            return Err(CompetitionError::InvalidRosterOperation(format!(
                "registration {registration_id} is {}",
                registration.status.as_str()
            )));
        }
        if registration.team_id == Some(team_id) {
            return Ok(registration.clone());
        }
        let team = self.team(team_id)?;
        if team.status == TeamStatus::Withdrawn {
            return Err(CompetitionError::InvalidRosterOperation(format!(
                "team {team_id} is withdrawn"
            )));
        }
        let max = self.tournament.config.max_players_per_team;
        if formation::member_count(&self.registrations, team_id) >= max {
            return Err(CompetitionError::TeamFull { team_id, max });
        }

        let before = self.registrations[reg_index].clone();
        self.registrations[reg_index].team_id = Some(team_id);
        let after = self.registrations[reg_index].clone();
        journal.record(
            AuditDraft::new("registration.assign", EntityKind::Registration, registration_id)
                .before(&before)?
                .after(&after)?,
        );
        Ok(after)
    }

    /// Spread unassigned confirmed registrations over the registered teams
    pub fn auto_assign_teams(
        &mut self,
        access: &Access,
        balance_by_skill: bool,
        _now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<AssignmentReport> {
        access.require_organizer(self.id(), "assign teams in")?;
        self.require_mode(FormationMode::OrganizerAssigned)?;
        self.roster_guard()?;

        let report = formation::auto_assign(
            &mut self.registrations,
            &self.teams,
            self.tournament.config.max_players_per_team,
            balance_by_skill,
        );
        journal.record(
            AuditDraft::new("roster.auto_assign", EntityKind::Tournament, self.tournament.id)
                .after(&report)?,
        );
        info!(
            "Auto-assigned {} registrations in tournament {} ({} left over)",
            report.assigned.len(),
            self.tournament.id,
            report.unassigned.len()
        );
        Ok(report)
    }

    // ---------------------------------------------------------------------
    // Matches
    // ---------------------------------------------------------------------

    /// Scheduled -> InProgress for one match
    pub fn start_match(
        &mut self,
        access: &Access,
        match_id: MatchId,
        _now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Match> {
        access.require_scorer(self.id(), "start matches in")?;
        check_transition(self.status(), Transition::RecordResult)?;
        let before = self.match_by_id(match_id)?.clone();
        ProgressionEngine::new(&mut self.matches, &mut self.teams, &self.tournament.config)
            .start_match(match_id)?;
        let after = self.match_by_id(match_id)?.clone();
        if before.status != after.status {
            journal.record(
                AuditDraft::new("match.start", EntityKind::Match, match_id)
                    .before(&before)?
                    .after(&after)?,
            );
            journal.notify(CompetitionEvent::MatchStarted {
                tournament_id: self.tournament.id,
                match_id,
            });
        }
        Ok(after)
    }

    fn journal_result(
        &self,
        action: &str,
        change: &ResultChange,
        corrected: bool,
        journal: &mut Journal,
    ) -> CompetitionResult<()> {
        let after = self.match_by_id(change.match_id)?;
        journal.record(
            AuditDraft::new(action, EntityKind::Match, change.match_id)
                .before(&change.previous)?
                .after(after)?,
        );
        journal.notify(CompetitionEvent::ResultRecorded {
            tournament_id: self.tournament.id,
            match_id: change.match_id,
            winner: change.winner,
            corrected,
        });
        info!(
            "Recorded result for match {} ({}) in tournament {}",
            after.label(),
            action,
            self.tournament.id
        );
        Ok(())
    }

    /// Record a score and propagate the result
    pub fn enter_score(
        &mut self,
        access: &Access,
        match_id: MatchId,
        home_score: u32,
        away_score: u32,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<ResultChange> {
        access.require_scorer(self.id(), "record results in")?;
        check_transition(self.status(), Transition::RecordResult)?;
        let change = ProgressionEngine::new(&mut self.matches, &mut self.teams, &self.tournament.config)
            .enter_result(
                match_id,
                ResultInput::Score {
                    home: home_score,
                    away: away_score,
                },
                now,
            )?;
        self.journal_result("match.score", &change, false, journal)?;
        Ok(change)
    }

    /// Award the match to the opponent of `forfeiting_team_id`
    pub fn record_forfeit(
        &mut self,
        access: &Access,
        match_id: MatchId,
        forfeiting_team_id: TeamId,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<ResultChange> {
        access.require_scorer(self.id(), "record results in")?;
        check_transition(self.status(), Transition::RecordResult)?;
        let change = ProgressionEngine::new(&mut self.matches, &mut self.teams, &self.tournament.config)
            .enter_result(
                match_id,
                ResultInput::Forfeit {
                    forfeiting: forfeiting_team_id,
                },
                now,
            )?;
        self.journal_result("match.forfeit", &change, false, journal)?;
        Ok(change)
    }

    /// Replace the score of a finished match and re-run propagation
    pub fn correct_score(
        &mut self,
        access: &Access,
        match_id: MatchId,
        home_score: u32,
        away_score: u32,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<ResultChange> {
        access.require_scorer(self.id(), "record results in")?;
        check_transition(self.status(), Transition::RecordResult)?;
        let change = ProgressionEngine::new(&mut self.matches, &mut self.teams, &self.tournament.config)
            .correct_result(
                match_id,
                ResultInput::Score {
                    home: home_score,
                    away: away_score,
                },
                now,
            )?;
        self.journal_result("match.correct", &change, true, journal)?;
        Ok(change)
    }

    // ---------------------------------------------------------------------
    // Standings
    // ---------------------------------------------------------------------

    /// Current standings, with unresolved tied groups
    pub fn standings(&self) -> Standings {
        standings::compute(&self.tournament, &self.teams, &self.matches)
    }

    /// Order tied groups by hand
    pub fn resolve_ties(
        &mut self,
        access: &Access,
        placements: &[ManualPlacement],
        _now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> CompetitionResult<Standings> {
        access.require_organizer(self.id(), "resolve ties in")?;
        check_transition(self.status(), Transition::ResolveTies)?;
        let current = self.standings();
        standings::validate_resolution(&current, placements)?;

        for placement in placements {
            let index = self.team_index(placement.team_id)?;
            let team = &mut self.teams[index];
            team.final_placement = Some(placement.final_placement);
            team.placement_manual = true;
        }

        let resolved = self.standings();
        if self.status() == TournamentStatus::Completed {
            self.write_placements(&resolved);
        }
        journal.record(
            AuditDraft::new(
                Transition::ResolveTies.action(),
                EntityKind::Tournament,
                self.tournament.id,
            )
            .before(&current.tied_groups)?
            .after(&placements)?,
        );
        info!(
            "Resolved {} tied placements in tournament {}",
            placements.len(),
            self.tournament.id
        );
        Ok(resolved)
    }
}
