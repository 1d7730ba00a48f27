//! In-memory class-group registry that answers cross-entity conflict checks.
//!
//! A class group's timetable collides with its professor when a slot overlaps
//! the professor's other groups or their personal entries, and with a student
//! when it overlaps one of the student's other groups. Personal entries named
//! `"<course code>:"` are copies of a group's own slots and are never held
//! against that group.
//!
//! The registry implements [`AsyncConflictProbe`], so a detector can be pointed
//! at it directly in place of the HTTP backend.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::alternatives::suggest_alternatives;
use crate::collection::TimetableCollection;
use crate::conflict::{AffectedUser, Role};
use crate::error::{Result, TimetableError};
use crate::grid::GridConfig;
use crate::interval::{OwnerRef, WeeklyInterval};
use crate::probe::{AsyncConflictProbe, ProbeConflict, ProbeVerdict};

/// Students listed by name in a conflict report before collapsing to a count.
const MAX_NAMED_STUDENTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassGroup {
    pub owner: OwnerRef,
    pub course_code: String,
    pub professor: Option<String>,
    pub students: Vec<String>,
    pub timetable: Vec<WeeklyInterval>,
}

impl ClassGroup {
    pub fn new(owner: impl Into<OwnerRef>, course_code: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            course_code: course_code.into(),
            professor: None,
            students: Vec::new(),
            timetable: Vec::new(),
        }
    }

    pub fn with_professor(mut self, id: impl Into<String>) -> Self {
        self.professor = Some(id.into());
        self
    }

    pub fn with_students<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.students = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timetable(mut self, entries: Vec<WeeklyInterval>) -> Self {
        self.timetable = entries;
        self
    }

    /// Prefix that marks this group's copies in a professor's personal entries.
    fn personal_prefix(&self) -> String {
        format!("{}:", self.course_code)
    }

    fn display_copy(&self, entry: &WeeklyInterval) -> WeeklyInterval {
        let mut copy = entry.clone();
        copy.label.name = format!("{}: {}", self.course_code, entry.label.name);
        copy
    }
}

/// People affected at one slot of a checked timetable, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotConflict {
    /// `"<Day> (<start> - <end>)"` of the new entry.
    pub slot: String,
    pub users: Vec<AffectedUser>,
}

#[derive(Debug, Default)]
struct Findings {
    slots: Vec<SlotConflict>,
    colliding: Vec<WeeklyInterval>,
    owners: Vec<OwnerRef>,
    busy: Vec<WeeklyInterval>,
}

impl Findings {
    fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn record(&mut self, slot: String, user: &AffectedUser, existing: &WeeklyInterval) {
        let position = match self.slots.iter().position(|s| s.slot == slot) {
            Some(position) => position,
            None => {
                self.slots.push(SlotConflict {
                    slot,
                    users: Vec::new(),
                });
                self.slots.len() - 1
            }
        };
        let users = &mut self.slots[position].users;
        if !users.iter().any(|u| u.id == user.id) {
            users.push(user.clone());
        }
        // A professor's synced copy shares its slot with the group's own entry.
        if !self.colliding.iter().any(|c| same_slot(c, existing)) {
            self.colliding.push(existing.clone());
        }
        if let Some(owner) = &existing.owner {
            if !self.owners.contains(owner) {
                self.owners.push(owner.clone());
            }
        }
    }

    /// Every affected person once, in discovery order.
    fn affected_users(&self) -> Vec<AffectedUser> {
        let mut users: Vec<AffectedUser> = Vec::new();
        for user in self.slots.iter().flat_map(|s| &s.users) {
            if !users.iter().any(|u| u.id == user.id) {
                users.push(user.clone());
            }
        }
        users
    }
}

fn same_slot(a: &WeeklyInterval, b: &WeeklyInterval) -> bool {
    a.day == b.day && a.start() == b.start() && a.end() == b.end()
}

#[derive(Debug, Default)]
struct RegistryState {
    people: HashMap<String, AffectedUser>,
    groups: HashMap<OwnerRef, ClassGroup>,
    personal: HashMap<String, Vec<WeeklyInterval>>,
}

impl RegistryState {
    fn group(&self, owner: &OwnerRef) -> Result<&ClassGroup> {
        self.groups
            .get(owner)
            .ok_or_else(|| TimetableError::Store(format!("class group not found: {}", owner)))
    }

    fn person(&self, id: &str) -> Result<&AffectedUser> {
        self.people
            .get(id)
            .ok_or_else(|| TimetableError::Store(format!("person not found: {}", id)))
    }

    fn other_groups<'a>(
        &'a self,
        current: &'a OwnerRef,
        member: impl Fn(&ClassGroup) -> bool + 'a,
    ) -> impl Iterator<Item = &'a ClassGroup> + 'a {
        self.groups
            .values()
            .filter(move |g| &g.owner != current && member(g))
    }

    /// Existing commitments of the group's professor, stamped with the owning
    /// group where there is one.
    fn professor_busy(&self, group: &ClassGroup, professor: &str) -> Vec<WeeklyInterval> {
        let mut busy: Vec<WeeklyInterval> = self
            .other_groups(&group.owner, |g| g.professor.as_deref() == Some(professor))
            .flat_map(|g| g.timetable.iter().map(move |e| e.clone().with_owner(g.owner.clone())))
            .collect();
        let prefix = group.personal_prefix();
        if let Some(entries) = self.personal.get(professor) {
            busy.extend(
                entries
                    .iter()
                    .filter(|e| !e.label.name.starts_with(&prefix))
                    .cloned(),
            );
        }
        busy
    }

    fn student_busy(&self, group: &ClassGroup, student: &str) -> Vec<WeeklyInterval> {
        self.other_groups(&group.owner, |g| g.students.iter().any(|s| s == student))
            .flat_map(|g| g.timetable.iter().map(move |e| e.clone().with_owner(g.owner.clone())))
            .collect()
    }

    fn find_conflicts(&self, group: &ClassGroup, entries: &[WeeklyInterval]) -> Result<Findings> {
        let mut people: Vec<(&AffectedUser, Vec<WeeklyInterval>)> = Vec::new();
        if let Some(professor) = &group.professor {
            people.push((self.person(professor)?, self.professor_busy(group, professor)));
        }
        for student in &group.students {
            people.push((self.person(student)?, self.student_busy(group, student)));
        }

        let mut findings = Findings::default();
        for (user, busy) in &people {
            for entry in entries {
                for existing in busy.iter().filter(|b| b.overlaps(entry)) {
                    findings.record(entry.slot_key(), user, existing);
                }
            }
        }
        findings.busy = people.into_iter().flat_map(|(_, busy)| busy).collect();
        Ok(findings)
    }
}

/// `"This time slot conflicts with existing schedules for N professor(s) and M student(s)."`,
/// leaving out a count that is zero.
pub fn conflict_summary(users: &[AffectedUser]) -> String {
    let professors = users.iter().filter(|u| u.role == Role::Professor).count();
    let students = users.iter().filter(|u| u.role == Role::Student).count();

    let mut parts = Vec::new();
    if professors > 0 {
        parts.push(format!("{} professor(s)", professors));
    }
    if students > 0 {
        parts.push(format!("{} student(s)", students));
    }
    format!(
        "This time slot conflicts with existing schedules for {}.",
        parts.join(" and ")
    )
}

/// Multi-line report of a rejected timetable, one line per conflicting slot.
pub fn conflict_report(slots: &[SlotConflict]) -> String {
    let mut report = String::from("The following time slots have conflicts:\n");
    for slot in slots {
        let _ = write!(report, "- {}: ", slot.slot);

        let professors: Vec<String> = slot
            .users
            .iter()
            .filter(|u| u.role == Role::Professor)
            .map(|u| format!("Professor {}", u.full_name()))
            .collect();
        let students: Vec<String> = slot
            .users
            .iter()
            .filter(|u| u.role != Role::Professor)
            .map(AffectedUser::full_name)
            .collect();

        if !professors.is_empty() {
            let _ = write!(report, "Professors: {}; ", professors.join(", "));
        }
        if students.len() > MAX_NAMED_STUDENTS {
            let _ = write!(report, "Students: {} students", students.len());
        } else if !students.is_empty() {
            let _ = write!(report, "Students: {}", students.join(", "));
        }
        report.push('\n');
    }
    report
}

#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    grid: GridConfig,
    state: RwLock<RegistryState>,
}

fn poisoned() -> TimetableError {
    TimetableError::Store("schedule registry lock poisoned".to_string())
}

impl ScheduleRegistry {
    /// `grid` bounds the free-gap fallback when suggesting alternatives.
    pub fn new(grid: GridConfig) -> Self {
        Self {
            grid,
            state: RwLock::default(),
        }
    }

    pub fn add_person(&self, person: AffectedUser) -> Result<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.people.insert(person.id.clone(), person);
        Ok(())
    }

    /// Register or replace a group as-is. Its timetable is not checked.
    ///
    /// # Errors
    /// Returns `TimetableError::Store` when the professor or a student is unknown.
    pub fn add_group(&self, group: ClassGroup) -> Result<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        for id in group.professor.iter().chain(&group.students) {
            state.person(id)?;
        }
        debug!(group = %group.owner, course = %group.course_code, "registering class group");
        sync_professor(&mut state, &group);
        state.groups.insert(group.owner.clone(), group);
        Ok(())
    }

    pub fn set_personal_entries(&self, person_id: &str, entries: Vec<WeeklyInterval>) -> Result<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.person(person_id)?;
        state.personal.insert(person_id.to_string(), entries);
        Ok(())
    }

    pub fn personal_entries(&self, person_id: &str) -> Result<Vec<WeeklyInterval>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.personal.get(person_id).cloned().unwrap_or_default())
    }

    pub fn group_timetable(&self, owner: &OwnerRef) -> Result<TimetableCollection> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let group = state.group(owner)?;
        Ok(TimetableCollection::from_entries(
            owner.clone(),
            group.timetable.clone(),
        ))
    }

    /// Check one candidate entry for `owner`'s group against everyone the
    /// group involves.
    ///
    /// # Errors
    /// Returns `TimetableError::Store` for an unknown group.
    pub fn check_entry(&self, owner: &OwnerRef, candidate: &WeeklyInterval) -> Result<ProbeVerdict> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let group = state.group(owner)?;
        let findings = state.find_conflicts(group, std::slice::from_ref(candidate))?;

        if findings.is_empty() {
            debug!(group = %owner, candidate = %candidate.slot_key(), "no cross-group conflicts");
            return Ok(ProbeVerdict::clear());
        }

        let affected_users = findings.affected_users();
        debug!(
            group = %owner,
            candidate = %candidate.slot_key(),
            affected = affected_users.len(),
            "cross-group conflict"
        );
        Ok(ProbeVerdict::Conflict(ProbeConflict {
            message: conflict_summary(&affected_users),
            alternatives: suggest_alternatives(candidate, &findings.busy, &self.grid),
            affected_users,
            affected_owners: findings.owners,
            conflicting_intervals: findings.colliding,
        }))
    }

    /// Replace a group's whole timetable after checking every entry.
    ///
    /// On success the professor's personal entries for this course are
    /// replaced by copies of the new timetable.
    ///
    /// # Errors
    /// - `TimetableError::Conflict` carrying a [`conflict_report`] when any
    ///   entry collides with the professor or a student
    /// - `TimetableError::Store` for an unknown group
    pub fn replace_timetable(&self, owner: &OwnerRef, entries: Vec<WeeklyInterval>) -> Result<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let group = state.group(owner)?;
        let findings = state.find_conflicts(group, &entries)?;
        if !findings.is_empty() {
            info!(group = %owner, slots = findings.slots.len(), "timetable rejected");
            return Err(TimetableError::Conflict(format!(
                "Timetable conflicts detected: {}",
                conflict_report(&findings.slots)
            )));
        }

        let mut group = group.clone();
        group.timetable = entries
            .into_iter()
            .map(|e| e.with_owner(owner.clone()))
            .collect();
        info!(group = %owner, entries = group.timetable.len(), "timetable replaced");
        sync_professor(&mut state, &group);
        state.groups.insert(owner.clone(), group);
        Ok(())
    }

    /// Entries of every group the student attends, named `"<course code>: <name>"`.
    pub fn student_timetable(&self, student_id: &str) -> Result<Vec<WeeklyInterval>> {
        self.composed(|g| g.students.iter().any(|s| s == student_id))
    }

    /// Entries of every group the professor teaches, named `"<course code>: <name>"`.
    pub fn professor_timetable(&self, professor_id: &str) -> Result<Vec<WeeklyInterval>> {
        self.composed(|g| g.professor.as_deref() == Some(professor_id))
    }

    fn composed(&self, member: impl Fn(&ClassGroup) -> bool) -> Result<Vec<WeeklyInterval>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut groups: Vec<&ClassGroup> = state.groups.values().filter(|g| member(g)).collect();
        groups.sort_by(|a, b| a.course_code.cmp(&b.course_code));

        let mut entries: Vec<WeeklyInterval> = groups
            .into_iter()
            .flat_map(|g| g.timetable.iter().map(move |e| g.display_copy(e)))
            .collect();
        entries.sort_by_key(|e| (e.day, e.start()));
        Ok(entries)
    }
}

/// Mirror a group's timetable into its professor's personal entries.
fn sync_professor(state: &mut RegistryState, group: &ClassGroup) {
    let Some(professor) = &group.professor else {
        return;
    };
    if group.timetable.is_empty() {
        return;
    }
    let prefix = group.personal_prefix();
    let personal = state.personal.entry(professor.clone()).or_default();
    personal.retain(|e| !e.label.name.starts_with(&prefix));
    personal.extend(group.timetable.iter().map(|e| {
        let mut copy = group.display_copy(e);
        copy.owner = None;
        copy
    }));
}

#[async_trait]
impl AsyncConflictProbe for ScheduleRegistry {
    async fn probe(&self, owner: &OwnerRef, candidate: &WeeklyInterval) -> Result<ProbeVerdict> {
        self.check_entry(owner, candidate)
    }
}
