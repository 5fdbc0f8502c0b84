//! Read-only statistics over the balance store and the event log.
//!
//! Aggregates are computed from a plain read of each row; no locking
//! against concurrent writers, so a rollup taken mid-write may be a few
//! coins stale. Period sums are windowed over event timestamps and are
//! distinct from live balances, whose history is unbounded.

use std::collections::{HashMap, HashSet};

use shared::{
    ActionBreakdownDto, ChildPeriodStatsDto, EventDto, GroupBreakdownDto, GroupPeriodStatsDto,
    MonthlyReportDto, MonthlyResultDto, MonthlyResultRowDto, MonthlySummaryDto, TopChildDto,
};

use crate::domain::calendar;
use crate::domain::commands::{ChildStatsFilter, EventFilter};
use crate::domain::models::{Child, Event};
use crate::errors::{LedgerError, Result};
use crate::storage::{
    ActionRepository, ChildRepository, Db, EventRepository, GroupRepository, MonthlyResultRepository,
};

/// Display label for manual adjustments in event listings, where gameplay
/// events show their action's catalog name.
const ADJUSTMENT_LABEL: &str = "Balance adjustment";

const TOP_CHILDREN_LIMIT: usize = 15;

#[derive(Clone)]
pub struct StatsService {
    children: ChildRepository,
    groups: GroupRepository,
    actions: ActionRepository,
    events: EventRepository,
    monthly: MonthlyResultRepository,
}

impl StatsService {
    pub fn new(db: Db) -> Self {
        Self {
            children: ChildRepository::new(db.clone()),
            groups: GroupRepository::new(db.clone()),
            actions: ActionRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            monthly: MonthlyResultRepository::new(db),
        }
    }

    /// Per-group rollup: roster size, live balance total, and credited
    /// sum within the optional `[from, to]` local-day window.
    pub async fn groups_in_period(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<GroupPeriodStatsDto>> {
        let (lower, upper) = calendar::period_bounds(from, to)?;
        let credited_by_child = self.credited_by_child(lower.as_deref(), upper.as_deref()).await?;
        let roster = self.children.list().await?;

        let mut rollups = Vec::new();
        for group in self.groups.list().await? {
            let kids: Vec<&Child> = roster
                .iter()
                .filter(|c| c.group_id.as_deref() == Some(group.id.as_str()))
                .collect();
            rollups.push(GroupPeriodStatsDto {
                children_count: kids.len() as i64,
                total_balance: kids.iter().map(|c| c.balance).sum(),
                period_credited: kids
                    .iter()
                    .map(|c| credited_by_child.get(&c.id).map(|t| t.0).unwrap_or(0))
                    .sum(),
                group_id: group.id,
                group_name: group.name,
            });
        }
        Ok(rollups)
    }

    /// Per-child rollup with optional group / name-substring filters,
    /// ordered as a leaderboard: balance descending, ties broken by child
    /// id (implementation-defined, stable).
    pub async fn children_in_period(&self, filter: ChildStatsFilter) -> Result<Vec<ChildPeriodStatsDto>> {
        let (lower, upper) = calendar::period_bounds(filter.from.as_deref(), filter.to.as_deref())?;
        let credited_by_child = self.credited_by_child(lower.as_deref(), upper.as_deref()).await?;
        let group_names = self.group_names().await?;

        let mut roster = self.children.list().await?;
        if let Some(group_id) = &filter.group_id {
            roster.retain(|c| c.group_id.as_deref() == Some(group_id.as_str()));
        }
        if let Some(query) = &filter.name_query {
            let query = query.to_lowercase();
            roster.retain(|c| c.full_name.to_lowercase().contains(&query));
        }

        let mut rows: Vec<ChildPeriodStatsDto> = roster
            .into_iter()
            .map(|child| {
                let (credited, count) = credited_by_child.get(&child.id).copied().unwrap_or((0, 0));
                ChildPeriodStatsDto {
                    group_name: child
                        .group_id
                        .as_ref()
                        .and_then(|gid| group_names.get(gid).cloned()),
                    id: child.id,
                    full_name: child.full_name,
                    group_id: child.group_id,
                    balance: child.balance,
                    period_credited: credited,
                    actions_count: count,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    /// Raw event listing, newest first, with child and action display
    /// names joined in.
    pub async fn events_in_period(&self, filter: EventFilter) -> Result<Vec<EventDto>> {
        let (lower, upper) = calendar::period_bounds(filter.from.as_deref(), filter.to.as_deref())?;
        let events = self
            .events
            .list_filtered(filter.child_id.as_deref(), lower.as_deref(), upper.as_deref())
            .await?;

        let roster = self.children.list().await?;
        let children_by_id: HashMap<&str, &Child> =
            roster.iter().map(|c| (c.id.as_str(), c)).collect();

        let events: Vec<Event> = match &filter.group_id {
            Some(group_id) => events
                .into_iter()
                .filter(|e| {
                    children_by_id
                        .get(e.child_id.as_str())
                        .map(|c| c.group_id.as_deref() == Some(group_id.as_str()))
                        .unwrap_or(false)
                })
                .collect(),
            None => events,
        };

        let action_names = self.action_names().await?;
        Ok(events
            .into_iter()
            .map(|event| enrich(event, &children_by_id, &action_names))
            .collect())
    }

    /// Full event history of one child (optionally windowed) for the
    /// detail view. Unknown child ids are an error here, unlike the
    /// filtered listing.
    pub async fn child_history(
        &self,
        child_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<EventDto>> {
        if self.children.get(child_id).await?.is_none() {
            return Err(LedgerError::not_found("child", child_id));
        }
        self.events_in_period(EventFilter {
            group_id: None,
            child_id: Some(child_id.to_string()),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        })
        .await
    }

    /// All closed months, newest first. With a group filter, each record
    /// narrows to the group's rows and its total is recomputed.
    pub async fn monthly_results(&self, group_id: Option<&str>) -> Result<Vec<MonthlyResultDto>> {
        let results = self.monthly.list().await?;
        Ok(results
            .into_iter()
            .map(|result| {
                let mut rows: Vec<MonthlyResultRowDto> = result
                    .children
                    .into_iter()
                    .map(|row| MonthlyResultRowDto {
                        child_id: row.child_id,
                        full_name: row.full_name,
                        group_id: row.group_id,
                        balance: row.balance,
                    })
                    .collect();
                if let Some(group_id) = group_id {
                    rows.retain(|r| r.group_id.as_deref() == Some(group_id));
                }
                let total_sum = if group_id.is_some() {
                    rows.iter().map(|r| r.balance).sum()
                } else {
                    result.total_sum
                };
                MonthlyResultDto {
                    year: result.year,
                    month: result.month,
                    children: rows,
                    total_sum,
                }
            })
            .collect())
    }

    /// Deep-dive over one closed month: totals, per-action breakdown,
    /// top children by frozen coins, per-group totals.
    pub async fn monthly_report(
        &self,
        year: i32,
        month: u32,
        group_id: Option<&str>,
    ) -> Result<MonthlyReportDto> {
        let result = self
            .monthly
            .get(year, month)
            .await?
            .ok_or_else(|| LedgerError::not_found("monthly result", format!("{year}-{month:02}")))?;

        let mut rows = result.children;
        if let Some(group_id) = group_id {
            rows.retain(|r| r.group_id.as_deref() == Some(group_id));
        }

        let total_coins: i64 = rows.iter().map(|r| r.balance).sum();
        let children_count = rows.len() as i64;
        let avg_coins_per_child = if children_count > 0 {
            round1(total_coins as f64 / children_count as f64)
        } else {
            0.0
        };

        let (start, end) = calendar::month_window(year, month)?;
        let mut events = self.events.list_filtered(None, Some(&start), Some(&end)).await?;
        if group_id.is_some() {
            let member_ids: HashSet<&str> = rows.iter().map(|r| r.child_id.as_str()).collect();
            events.retain(|e| member_ids.contains(e.child_id.as_str()));
        }

        let action_names = self.action_names().await?;
        let mut by_action: HashMap<String, ActionBreakdownDto> = HashMap::new();
        for event in &events {
            let key = event
                .action_id
                .clone()
                .unwrap_or_else(|| "manual_adjustment".to_string());
            let entry = by_action.entry(key.clone()).or_insert_with(|| ActionBreakdownDto {
                action_name: display_action_name(event.action_id.as_deref(), &action_names),
                action_id: key,
                count: 0,
                total_coins: 0,
            });
            entry.count += 1;
            entry.total_coins += event.credited;
        }
        let mut by_action: Vec<ActionBreakdownDto> = by_action.into_values().collect();
        by_action.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.action_id.cmp(&b.action_id)));

        let group_names = self.group_names().await?;
        let top_children_by_coins: Vec<TopChildDto> = rows
            .iter()
            .take(TOP_CHILDREN_LIMIT)
            .map(|row| TopChildDto {
                child_id: row.child_id.clone(),
                full_name: row.full_name.clone(),
                group_name: row.group_id.as_ref().and_then(|gid| group_names.get(gid).cloned()),
                balance: row.balance,
            })
            .collect();

        let mut by_group: HashMap<String, GroupBreakdownDto> = HashMap::new();
        for row in &rows {
            let key = row.group_id.clone().unwrap_or_default();
            let entry = by_group.entry(key.clone()).or_insert_with(|| GroupBreakdownDto {
                group_name: group_names.get(&key).cloned().unwrap_or_default(),
                group_id: key,
                children_count: 0,
                total_coins: 0,
                avg_coins: 0.0,
            });
            entry.children_count += 1;
            entry.total_coins += row.balance;
        }
        let mut by_group: Vec<GroupBreakdownDto> = by_group.into_values().collect();
        for entry in &mut by_group {
            entry.avg_coins = round1(entry.total_coins as f64 / entry.children_count as f64);
        }
        by_group.sort_by(|a, b| b.total_coins.cmp(&a.total_coins).then_with(|| a.group_id.cmp(&b.group_id)));

        Ok(MonthlyReportDto {
            year,
            month,
            summary: MonthlySummaryDto {
                total_coins,
                total_actions: events.len() as i64,
                children_count,
                avg_coins_per_child,
            },
            by_action,
            top_children_by_coins,
            by_group,
        })
    }

    /// Map of child id to (credited sum, event count) within the window.
    async fn credited_by_child(
        &self,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> Result<HashMap<String, (i64, i64)>> {
        let totals = self.events.period_totals(lower, upper).await?;
        Ok(totals
            .into_iter()
            .map(|t| (t.child_id, (t.credited, t.events)))
            .collect())
    }

    async fn group_names(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .groups
            .list()
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect())
    }

    async fn action_names(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .actions
            .list()
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect())
    }
}

fn display_action_name(action_id: Option<&str>, action_names: &HashMap<String, String>) -> String {
    match action_id {
        Some(id) => action_names.get(id).cloned().unwrap_or_else(|| id.to_string()),
        None => ADJUSTMENT_LABEL.to_string(),
    }
}

fn enrich(event: Event, children_by_id: &HashMap<&str, &Child>, action_names: &HashMap<String, String>) -> EventDto {
    EventDto {
        child_name: children_by_id
            .get(event.child_id.as_str())
            .map(|c| c.full_name.clone())
            .unwrap_or_else(|| event.child_id.clone()),
        action_name: display_action_name(event.action_id.as_deref(), action_names),
        id: event.id,
        child_id: event.child_id,
        action_id: event.action_id,
        kind: event.kind.as_str().to_string(),
        credited: event.credited,
        timestamp: event.timestamp,
        comment: event.comment,
        actor: event.actor,
        balance_after: event.balance_after,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Action, Event, Group};
    use crate::storage::connection::test_support::open_test_db;
    use chrono::{DateTime, Local, TimeZone};

    struct Fixture {
        stats: StatsService,
        sunshine: Group,
        daisy: Group,
        masha: Child,
        petya: Child,
        anya: Child,
    }

    fn march(day: u32, hour: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, day, hour, 0, 0).single().unwrap()
    }

    fn battery() -> Action {
        Action {
            id: "battery".to_string(),
            name: "Battery drop-off".to_string(),
            credit: 5,
            cooldown_secs: 60,
            daily_cap: 10,
        }
    }

    /// Two groups, three children, a handful of March events:
    /// Masha (Sunshine) +5 on the 5th, +5 on the 12th;
    /// Petya (Sunshine) +5 on the 20th; Anya (Daisy) adjusted +7 on the 12th.
    async fn fixture(db: &Db) -> Fixture {
        let groups = GroupRepository::new(db.clone());
        let children = ChildRepository::new(db.clone());
        let events = EventRepository::new(db.clone());

        let sunshine = Group::new("Sunshine");
        let daisy = Group::new("Daisy");
        groups.store(&sunshine).await.unwrap();
        groups.store(&daisy).await.unwrap();

        let masha = Child::new("Masha Ivanova", Some(sunshine.id.clone()));
        let petya = Child::new("Petya Sidorov", Some(sunshine.id.clone()));
        let anya = Child::new("Anya Kozlova", Some(daisy.id.clone()));
        for child in [&masha, &petya, &anya] {
            children.store(child).await.unwrap();
        }

        let action = battery();
        for (child, day, after) in [(&masha, 5, 5), (&masha, 12, 10), (&petya, 20, 5)] {
            let event =
                Event::action_credit(child, &action, calendar::timestamp(march(day, 10)), after);
            events.append(&event).await.unwrap();
        }
        let adjustment = Event::manual_adjustment(
            &anya,
            7,
            "weekend cleanup".to_string(),
            "root".to_string(),
            calendar::timestamp(march(12, 15)),
            7,
        );
        events.append(&adjustment).await.unwrap();

        Fixture {
            stats: StatsService::new(db.clone()),
            sunshine,
            daisy,
            masha,
            petya,
            anya,
        }
    }

    #[tokio::test]
    async fn group_rollups_split_balances_and_period_sums() {
        let handle = open_test_db().await;
        let f = fixture(&handle.db).await;

        let rollups = f.stats.groups_in_period(None, None).await.unwrap();
        let sunshine = rollups.iter().find(|g| g.group_id == f.sunshine.id).unwrap();
        assert_eq!(sunshine.children_count, 2);
        assert_eq!(sunshine.total_balance, 15);
        assert_eq!(sunshine.period_credited, 15);

        // Window cuts off Masha's first credit and Petya entirely.
        let windowed = f
            .stats
            .groups_in_period(Some("2026-03-10"), Some("2026-03-15"))
            .await
            .unwrap();
        let sunshine = windowed.iter().find(|g| g.group_id == f.sunshine.id).unwrap();
        assert_eq!(sunshine.period_credited, 5);
        let daisy = windowed.iter().find(|g| g.group_id == f.daisy.id).unwrap();
        assert_eq!(daisy.period_credited, 7);
        // Live balances are not windowed.
        assert_eq!(sunshine.total_balance, 15);
    }

    #[tokio::test]
    async fn child_rollups_filter_and_order_as_a_leaderboard() {
        let handle = open_test_db().await;
        let f = fixture(&handle.db).await;

        let all = f.stats.children_in_period(ChildStatsFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        // Masha 10, Anya 7, Petya 5.
        assert_eq!(all[0].id, f.masha.id);
        assert_eq!(all[1].id, f.anya.id);
        assert_eq!(all[2].id, f.petya.id);
        assert_eq!(all[0].actions_count, 2);
        assert_eq!(all[1].group_name.as_deref(), Some("Daisy"));

        let filtered = f
            .stats
            .children_in_period(ChildStatsFilter {
                group_id: Some(f.sunshine.id.clone()),
                name_query: Some("sido".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, f.petya.id);
    }

    #[tokio::test]
    async fn event_listing_enriches_names_and_honors_filters() {
        let handle = open_test_db().await;
        let f = fixture(&handle.db).await;

        let all = f.stats.events_in_period(EventFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        // Newest first.
        assert_eq!(all[0].child_id, f.petya.id);

        let adjustment = all.iter().find(|e| e.kind == "manual_adjustment").unwrap();
        assert_eq!(adjustment.action_name, ADJUSTMENT_LABEL);
        assert_eq!(adjustment.child_name, "Anya Kozlova");
        assert_eq!(adjustment.comment.as_deref(), Some("weekend cleanup"));

        let daisy_only = f
            .stats
            .events_in_period(EventFilter { group_id: Some(f.daisy.id.clone()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(daisy_only.len(), 1);

        let windowed = f
            .stats
            .events_in_period(EventFilter {
                from: Some("2026-03-12".to_string()),
                to: Some("2026-03-12".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(windowed.len(), 2);
    }

    #[tokio::test]
    async fn child_history_requires_a_known_child() {
        let handle = open_test_db().await;
        let f = fixture(&handle.db).await;

        let history = f.stats.child_history(&f.masha.id, None, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action_name, "Battery drop-off");

        assert!(matches!(
            f.stats.child_history("child::ghost", None, None).await,
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn monthly_results_narrow_to_a_group_with_recomputed_total() {
        let handle = open_test_db().await;
        let f = fixture(&handle.db).await;

        let monthly = MonthlyResultRepository::new(handle.db.clone());
        let roster = ChildRepository::new(handle.db.clone()).list().await.unwrap();
        for child in &roster {
            monthly.freeze_child(2026, 3, child, "2026-04-01T00:00:01.000000Z").await.unwrap();
        }
        monthly.insert_header(2026, 3, 22, "2026-04-01T00:00:01.000000Z").await.unwrap();

        let all = f.stats.monthly_results(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_sum, 22);
        assert_eq!(all[0].children.len(), 3);

        let daisy = f.stats.monthly_results(Some(&f.daisy.id)).await.unwrap();
        assert_eq!(daisy[0].children.len(), 1);
        assert_eq!(daisy[0].total_sum, 7);
    }

    #[tokio::test]
    async fn monthly_report_summarizes_a_closed_month() {
        let handle = open_test_db().await;
        let f = fixture(&handle.db).await;

        let monthly = MonthlyResultRepository::new(handle.db.clone());
        let roster = ChildRepository::new(handle.db.clone()).list().await.unwrap();
        for child in &roster {
            monthly.freeze_child(2026, 3, child, "2026-04-01T00:00:01.000000Z").await.unwrap();
        }
        monthly.insert_header(2026, 3, 22, "2026-04-01T00:00:01.000000Z").await.unwrap();

        let report = f.stats.monthly_report(2026, 3, None).await.unwrap();
        assert_eq!(report.summary.total_coins, 22);
        assert_eq!(report.summary.total_actions, 4);
        assert_eq!(report.summary.children_count, 3);
        assert_eq!(report.summary.avg_coins_per_child, 7.3);

        assert_eq!(report.by_action[0].action_id, "battery");
        assert_eq!(report.by_action[0].count, 3);
        assert_eq!(report.by_action[0].total_coins, 15);
        let adjustments = report.by_action.iter().find(|a| a.action_id == "manual_adjustment").unwrap();
        assert_eq!(adjustments.total_coins, 7);

        assert_eq!(report.top_children_by_coins[0].full_name, "Masha Ivanova");
        assert_eq!(report.by_group[0].total_coins, 15);
        assert_eq!(report.by_group[0].children_count, 2);

        assert!(matches!(
            f.stats.monthly_report(2026, 4, None).await,
            Err(LedgerError::NotFound { .. })
        ));
    }
}
