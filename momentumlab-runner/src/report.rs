//! Markdown rendering of signals, positions and exit notifications.

use std::fmt::Write;

use momentumlab_core::lifecycle::PositionStore;
use momentumlab_core::strategy::{BuildOutcome, MaxProfit, OptionStrategy};
use momentumlab_core::universe::UniverseRanking;

use crate::cycle::{Exclusion, LongCycle, ShortCycle};
use crate::manage::ExitPass;

pub struct MarkdownReport;

impl MarkdownReport {
    pub fn universe(&self, ranking: &UniverseRanking) -> String {
        let mut out = String::from("# Universe\n\n");
        let _ = writeln!(
            out,
            "{} candidates, {} passed filters, {} ranked.\n",
            ranking.total_candidates,
            ranking.passed_filter(),
            ranking.ranked.len()
        );
        out.push_str("| Rank | Ticker | Score | Market Cap | Avg $ Volume |\n");
        out.push_str("|------|--------|-------|------------|--------------|\n");
        for r in &ranking.ranked {
            let _ = writeln!(
                out,
                "| {} | {} | {:.2} | {:.2}B | {:.1}M |",
                r.rank,
                r.candidate.ticker,
                r.score,
                r.candidate.market_cap / 1e9,
                r.candidate.avg_dollar_volume / 1e6
            );
        }
        if !ranking.filtered.is_empty() {
            out.push_str("\n## Filtered\n\n");
            for (reason, count) in &ranking.filtered {
                let _ = writeln!(out, "- {reason}: {count}");
            }
        }
        if !ranking.unscorable.is_empty() {
            let _ = writeln!(out, "\nUnscorable: {}", ranking.unscorable.join(", "));
        }
        out
    }

    pub fn long(&self, cycle: &LongCycle) -> String {
        let mut out = format!("# Long Momentum Signals ({})\n\n", cycle.as_of);
        let _ = writeln!(
            out,
            "Universe: {} tickers. Config `{}`, data `{}`.\n",
            cycle.universe_size,
            short_hash(&cycle.config_hash),
            short_hash(&cycle.dataset_hash)
        );
        out.push_str("| Rank | Ticker | Score | Signal | Allocation |\n");
        out.push_str("|------|--------|-------|--------|------------|\n");
        for r in &cycle.recommendations {
            let _ = writeln!(
                out,
                "| {} | {} | {:+.2}% | {} | {:.2}% |",
                r.rank,
                r.ticker,
                r.score * 100.0,
                r.signal,
                r.allocation_pct
            );
        }
        exclusions(&mut out, &cycle.exclusions);
        out
    }

    pub fn short(&self, cycle: &ShortCycle) -> String {
        let mut out = format!("# Short Momentum Signals ({})\n\n", cycle.as_of);
        let _ = writeln!(
            out,
            "Universe: {} tickers, {} failed the momentum filters. Config `{}`, data `{}`.\n",
            cycle.universe_size,
            cycle.screened_out.len(),
            short_hash(&cycle.config_hash),
            short_hash(&cycle.dataset_hash)
        );
        out.push_str("| Rank | Ticker | Score | 63-5 | 5-0 | Entry | Decision | Structure |\n");
        out.push_str("|------|--------|-------|------|-----|-------|----------|-----------|\n");
        for c in &cycle.candidates {
            let structure = match &c.strategy {
                BuildOutcome::Built { strategy } => describe(strategy),
                BuildOutcome::Rejected { reason } => format!("rejected: {reason}"),
            };
            let _ = writeln!(
                out,
                "| {} | {} | {:+.2}% | {:+.2}% | {:+.2}% | {} ({:.0}%) | {} | {} |",
                c.rank,
                c.ticker,
                c.record.score * 100.0,
                c.record.component("perf_63_5").unwrap_or(f64::NAN) * 100.0,
                c.record.component("perf_5_0").unwrap_or(f64::NAN) * 100.0,
                c.entry.decision,
                c.entry.soft_score * 100.0,
                c.decision,
                structure
            );
        }

        let built: Vec<_> = cycle
            .candidates
            .iter()
            .filter_map(|c| c.strategy.strategy().map(|s| (c, s)))
            .collect();
        if !built.is_empty() {
            out.push_str("\n## Structures\n");
            for (c, s) in built {
                let m = s.metrics();
                let _ = writeln!(out, "\n### {} ({})\n", c.ticker, c.decision);
                let _ = writeln!(out, "- Expiry: {}", s.expiry());
                for (role, leg) in [("Long", Some(s.long_leg())), ("Short", s.short_leg())] {
                    if let Some(leg) = leg {
                        let g = &leg.quote.greeks;
                        let _ = writeln!(
                            out,
                            "- {role} put {:.2}: premium {:.2}, delta {:+.3}, gamma {:.4}, theta {:+.4}/day, vega {:.4}",
                            leg.strike(),
                            leg.premium(),
                            g.delta,
                            g.gamma,
                            g.theta,
                            g.vega
                        );
                    }
                }
                let _ = writeln!(out, "- Net debit: {:.2} (max loss ${:.2})", m.net_debit, m.max_loss);
                let _ = writeln!(out, "- Max profit: {}", max_profit(&m.max_profit));
                let _ = writeln!(out, "- Breakeven: {:.2}", m.breakeven);
                if let Some(rr) = m.risk_reward {
                    let _ = writeln!(out, "- Reward/risk: {rr:.2}");
                }
                let _ = writeln!(
                    out,
                    "- IV {:.1}% (rank {}), RV30 {:.1}%",
                    c.volatility.implied_vol * 100.0,
                    c.volatility.iv_rank.map_or("n/a".to_string(), |r| format!("{r:.0}")),
                    c.volatility.realized_vol_30d * 100.0
                );
            }
        }
        exclusions(&mut out, &cycle.exclusions);
        out
    }

    pub fn exits(&self, pass: &ExitPass) -> String {
        let mut out = String::from("# Exit Notifications\n\n");
        if pass.events.is_empty() {
            out.push_str("No exits this cycle.\n");
        } else {
            out.push_str("| Position | Ticker | Trigger | State | Contracts | Value |\n");
            out.push_str("|----------|--------|---------|-------|-----------|-------|\n");
            for e in &pass.events {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {:.2} |",
                    e.position_id, e.ticker, e.trigger, e.state, e.contracts_closed, e.strategy_value
                );
            }
        }
        if !pass.unobserved.is_empty() {
            let ids: Vec<String> = pass.unobserved.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "\nNo price this cycle (left open): {}", ids.join(", "));
        }
        out
    }

    pub fn positions(&self, store: &PositionStore) -> String {
        let mut out = String::from("# Open Positions\n\n");
        if store.open_count() == 0 {
            out.push_str("None.\n");
            return out;
        }
        out.push_str("| Position | Ticker | Structure | Entry | Expiry | Debit | Contracts | Risk |\n");
        out.push_str("|----------|--------|-----------|-------|--------|-------|-----------|------|\n");
        for p in store.open_positions() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {:.2} | {} | ${:.2} |",
                p.id(),
                p.ticker(),
                describe(p.strategy()),
                p.entry_date(),
                p.expiry_date(),
                p.entry_net_debit(),
                p.contract_count(),
                p.committed_risk()
            );
        }
        let _ = writeln!(out, "\nCommitted risk: ${:.2}", store.committed_risk());
        out
    }
}

fn describe(s: &OptionStrategy) -> String {
    match s.short_leg() {
        Some(short) => format!("{:.2}/{:.2} put spread", s.long_leg().strike(), short.strike()),
        None => format!("{:.2} put", s.long_leg().strike()),
    }
}

fn max_profit(p: &MaxProfit) -> String {
    match p {
        MaxProfit::Bounded(v) => format!("${v:.2}"),
        MaxProfit::Unbounded => "unbounded (to zero)".into(),
    }
}

fn short_hash(h: &str) -> &str {
    h.get(..12).unwrap_or(h)
}

fn exclusions(out: &mut String, list: &[Exclusion]) {
    if list.is_empty() {
        return;
    }
    out.push_str("\n## Excluded\n\n");
    for e in list {
        let _ = writeln!(out, "- {} ({}, {}): {}", e.ticker, e.stage, e.kind, e.reason);
    }
}
