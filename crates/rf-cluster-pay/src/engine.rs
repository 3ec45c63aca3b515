//! Cascade engine: one shared orchestrator for base and free game
//!
//! ```text
//!  ┌──────────── attempt (fresh SpinContext) ────────────┐
//!  │ SPIN_START ─► REVEAL ─► collectors ─► EVALUATE ─┐   │
//!  │                  ▲                              │   │
//!  │                  └──── tumble ◄── win && !cap ──┤   │
//!  │                                                 ▼   │
//!  │                     SPIN_END ◄──────────────────┘   │
//!  │   free spins (same cycle, grid persists)            │
//!  │   final win ─► acceptance ── rejected ─► new attempt│
//!  └─────────────────────────────────────────────────────┘
//! ```
//!
//! Game specifics are injected as capabilities: the board source, the cluster
//! finder, the win evaluator, the special-symbol policy and one grid
//! persistence policy per game type.

use rand::RngCore;

use crate::board::{BoardSource, ReelBoardSource, RevealRequest};
use crate::book::{Book, BookEvent};
use crate::cluster::{ClusterFinder, FloodFillFinder};
use crate::collector::{CollectorPolicy, SpecialSymbolPolicy};
use crate::config::GameConfig;
use crate::context::{GameType, SpinContext};
use crate::distribution::{BetMode, Distribution, DistributionConditions, draw_weighted};
use crate::error::{ConfigError, EngineError, EngineResult};
use crate::evaluate::{
    EvaluationInput, SpotMultiplierEvaluator, WinAggregate, WinEvaluator, quantize,
};
use crate::multiplier::{GridPersistence, PersistThroughFeature, ResetEverySpin};
use crate::paytable::PayTable;

/// Why an attempt was thrown away
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Final win differs from the distribution's exact target
    WinMismatch { target: f64, actual: f64 },
    /// Distribution forces free game but none triggered
    FreeGameMissing,
    /// Free game triggered on a distribution that does not allow it
    FreeGameUnwanted,
    /// Zero outcome on a criteria other than "0"
    ZeroWin,
}

/// Criteria that accepts a zero outcome
pub const ZERO_CRITERIA: &str = "0";

/// Cascade engine
pub struct CascadeEngine {
    config: GameConfig,
    paytable: PayTable,
    board_source: Box<dyn BoardSource>,
    finder: Box<dyn ClusterFinder>,
    evaluator: Box<dyn WinEvaluator>,
    special: Box<dyn SpecialSymbolPolicy>,
    base_persistence: Box<dyn GridPersistence>,
    free_persistence: Box<dyn GridPersistence>,
}

impl CascadeEngine {
    /// Engine with the default collaborators for `config`
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let paytable = config.build_paytable()?;
        Ok(Self {
            paytable,
            board_source: Box::new(ReelBoardSource::from_config(&config)),
            finder: Box::new(FloodFillFinder::new(
                config.min_cluster_size,
                config.symbols.clone(),
            )),
            evaluator: Box::new(SpotMultiplierEvaluator),
            special: Box::new(CollectorPolicy::new(
                config.symbols.clone(),
                config.maximum_board_mult,
                config.collector.threshold,
            )),
            base_persistence: Box::new(ResetEverySpin),
            free_persistence: Box::new(PersistThroughFeature),
            config,
        })
    }

    /// Builder: replace the board source
    pub fn with_board_source(mut self, source: impl BoardSource + 'static) -> Self {
        self.board_source = Box::new(source);
        self
    }

    /// Builder: replace the cluster finder
    pub fn with_cluster_finder(mut self, finder: impl ClusterFinder + 'static) -> Self {
        self.finder = Box::new(finder);
        self
    }

    /// Builder: replace the win evaluator
    pub fn with_evaluator(mut self, evaluator: impl WinEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Builder: replace the special-symbol policy
    pub fn with_special_symbols(mut self, policy: impl SpecialSymbolPolicy + 'static) -> Self {
        self.special = Box::new(policy);
        self
    }

    /// Builder: replace the grid persistence of one game type
    pub fn with_grid_persistence(
        mut self,
        game_type: GameType,
        policy: impl GridPersistence + 'static,
    ) -> Self {
        match game_type {
            GameType::BaseGame => self.base_persistence = Box::new(policy),
            GameType::FreeGame => self.free_persistence = Box::new(policy),
        }
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn persistence(&self, game_type: GameType) -> &dyn GridPersistence {
        match game_type {
            GameType::BaseGame => self.base_persistence.as_ref(),
            GameType::FreeGame => self.free_persistence.as_ref(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SIMULATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Simulate one bet of `mode` until the outcome satisfies `criteria`.
    ///
    /// Every attempt runs on a freshly built [`SpinContext`]; only the
    /// accepted attempt's book is returned.
    pub fn run_spin(
        &self,
        sim_id: u64,
        mode: &str,
        criteria: &str,
        rng: &mut dyn RngCore,
    ) -> EngineResult<Book> {
        let bet_mode = self
            .config
            .bet_mode(mode)
            .ok_or_else(|| EngineError::UnknownBetMode(mode.to_string()))?;
        let distribution =
            bet_mode
                .distribution(criteria)
                .ok_or_else(|| EngineError::UnknownCriteria {
                    mode: mode.to_string(),
                    criteria: criteria.to_string(),
                })?;

        let mut attempt = 0u32;
        loop {
            if let Some(max) = self.config.max_attempts {
                if attempt >= max {
                    return Err(EngineError::RetryLimitExceeded {
                        sim_id,
                        attempts: attempt,
                    });
                }
            }
            attempt += 1;

            let mut ctx = SpinContext::new(
                sim_id,
                attempt,
                criteria,
                &self.config.num_rows,
                self.config.global_multiplier,
            );
            match self.run_attempt(&mut ctx, bet_mode, distribution, rng)? {
                None => {
                    ctx.book.attempts = ctx.attempt;
                    return Ok(ctx.book);
                }
                Some(rejection) => {
                    log::debug!(
                        "sim {sim_id} attempt {} ('{}') rejected: {rejection:?}",
                        ctx.attempt,
                        ctx.criteria
                    );
                }
            }
        }
    }

    /// One attempt. Returns the rejection reason, or `None` when accepted.
    fn run_attempt(
        &self,
        ctx: &mut SpinContext,
        bet_mode: &BetMode,
        distribution: &Distribution,
        rng: &mut dyn RngCore,
    ) -> EngineResult<Option<Rejection>> {
        let conditions = &distribution.conditions;
        let forced_scatters = if conditions.force_freegame {
            draw_weighted(&conditions.scatter_triggers, rng).map(|w| w.count)
        } else {
            None
        };

        ctx.game_type = GameType::BaseGame;
        self.play_spin(ctx, conditions, forced_scatters, rng)?;

        let scatters = ctx.board.count_scatters(&self.config.symbols);
        if let Some(spins) = self.config.freespins_for(GameType::BaseGame, scatters) {
            if !conditions.force_freegame {
                return Ok(Some(Rejection::FreeGameUnwanted));
            }
            self.run_free_game(ctx, bet_mode, conditions, spins, rng)?;
        }

        let final_win = self.evaluate_final_win(ctx);
        Ok(self.check_repeat(ctx, distribution, final_win))
    }

    /// One spin: SPIN_START, reveal and cascade loop, SPIN_END
    fn play_spin(
        &self,
        ctx: &mut SpinContext,
        conditions: &DistributionConditions,
        forced_scatters: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()> {
        let game_type = ctx.game_type;
        let persistence = self.persistence(game_type);
        let roles = &self.config.symbols;
        let values = self.config.collector_values(conditions, game_type);

        // SPIN_START
        ctx.begin_spin();
        self.special.on_spin_start(&mut ctx.collector);
        persistence.on_spin_start(&mut ctx.hits);

        let request = RevealRequest {
            game_type,
            conditions,
            forced_scatters,
            trigger_threshold: self.config.trigger_threshold(game_type),
        };
        ctx.board = self.board_source.draw(&request, rng)?;
        ctx.emit(BookEvent::Reveal {
            board: ctx.board.symbols(),
            game_type,
            reel_set: ctx.board.reel_set().to_string(),
        });
        if ctx.in_free_game() {
            ctx.emit_grid();
        }

        let mut reveal_index = 0u32;
        loop {
            ctx.board.tag_collectors(roles, &mut ctx.next_collector_id);
            self.special
                .on_reveal(&mut ctx.collector, &ctx.board, &ctx.hits, values, rng)?;

            // EVALUATE against the grid as it stood before this reveal
            let clusters = self.finder.find(&ctx.board);
            let mut reveal = WinAggregate::default();
            self.evaluator.evaluate(
                EvaluationInput {
                    paytable: &self.paytable,
                    clusters: &clusters,
                    hits: &ctx.hits,
                    global_multiplier: ctx.global_multiplier,
                    spot_cap: self.config.maximum_board_mult,
                },
                &mut ctx.board,
                &mut reveal,
            )?;
            log::trace!(
                "sim {} {:?} reveal {}: {} win(s), {}",
                ctx.sim_id,
                game_type,
                reveal_index,
                reveal.wins.len(),
                reveal.total_win
            );

            if reveal.is_win() {
                ctx.wins.update_spinwin(reveal.total_win);
                ctx.wins.update_tumble_win(reveal.total_win);
                ctx.emit(BookEvent::WinInfo {
                    total_win: reveal.total_win,
                    wins: reveal.wins.clone(),
                });
                ctx.emit(BookEvent::UpdateTumbleWin {
                    amount: ctx.wins.tumble_win,
                });

                // One increment per (win, position) pair
                for pos in reveal.win_positions() {
                    ctx.hits.increment(pos)?;
                }
                ctx.emit_grid();
            }
            ctx.spin_wins.extend(&reveal);
            ctx.reveal_wins = reveal;

            if ctx.wins.running_bet_win >= self.config.wincap {
                ctx.wincap_triggered = true;
            }
            if !ctx.reveal_wins.is_win() || ctx.wincap_triggered {
                break;
            }

            let exploding = ctx.board.exploded_positions();
            let new_symbols = self.board_source.tumble(&mut ctx.board)?;
            ctx.emit(BookEvent::TumbleBoard {
                exploding,
                new_symbols,
            });
            reveal_index += 1;
        }

        // SPIN_END
        if let Some(win) = self.special.on_spin_end(&mut ctx.collector) {
            ctx.wins.update_spinwin(win.win);
            ctx.spin_wins.push(win.clone());
            ctx.emit(BookEvent::CollectorWin { win });
            if ctx.wins.running_bet_win >= self.config.wincap {
                ctx.wincap_triggered = true;
            }
        }
        ctx.emit(BookEvent::SetWin {
            amount: ctx.wins.spin_win,
        });
        persistence.on_spin_end(&mut ctx.hits);
        ctx.wins.update_gametype_wins(game_type);
        Ok(())
    }

    /// Free-spin feature entered from the base game
    fn run_free_game(
        &self,
        ctx: &mut SpinContext,
        bet_mode: &BetMode,
        conditions: &DistributionConditions,
        spins: u32,
        rng: &mut dyn RngCore,
    ) -> EngineResult<()> {
        let roles = &self.config.symbols;
        ctx.triggered_freegame = true;
        ctx.fs = 0;
        ctx.tot_fs = spins;
        ctx.emit(BookEvent::FreeSpinTrigger {
            total_fs: spins,
            positions: ctx.board.positions_where(|c| roles.is_scatter(&c.symbol)),
        });
        log::debug!(
            "sim {} entering free game: {} spins, preseed {:?}",
            ctx.sim_id,
            spins,
            bet_mode.feature_preseed_hits
        );

        ctx.game_type = GameType::FreeGame;
        self.free_persistence
            .on_feature_entry(&mut ctx.hits, bet_mode.feature_preseed_hits);

        while ctx.fs < ctx.tot_fs && !ctx.wincap_triggered {
            ctx.fs += 1;
            ctx.emit(BookEvent::UpdateFreeSpin {
                amount: ctx.fs,
                total: ctx.tot_fs,
            });
            self.play_spin(ctx, conditions, None, rng)?;

            if ctx.wincap_triggered {
                break;
            }
            let scatters = ctx.board.count_scatters(roles);
            if let Some(extra) = self.config.freespins_for(GameType::FreeGame, scatters) {
                ctx.tot_fs += extra;
                ctx.emit(BookEvent::FreeSpinRetrigger {
                    total_fs: ctx.tot_fs,
                    positions: ctx.board.positions_where(|c| roles.is_scatter(&c.symbol)),
                });
            }
        }

        ctx.emit(BookEvent::FreeSpinEnd {
            amount: ctx.wins.free_game_wins,
        });
        ctx.game_type = GameType::BaseGame;
        Ok(())
    }

    /// Clamp to the win cap and close the book
    fn evaluate_final_win(&self, ctx: &mut SpinContext) -> f64 {
        if ctx.wincap_triggered || ctx.wins.running_bet_win >= self.config.wincap {
            ctx.wincap_triggered = true;
            ctx.wins.clamp_to(self.config.wincap);
            ctx.emit(BookEvent::WinCap {
                amount: self.config.wincap,
            });
        }
        let final_win = quantize(ctx.wins.running_bet_win);
        ctx.emit(BookEvent::FinalWin { amount: final_win });

        let book = &mut ctx.book;
        book.base_game_wins = ctx.wins.base_game_wins;
        book.free_game_wins = ctx.wins.free_game_wins;
        book.payout_multiplier = final_win;
        book.triggered_freegame = ctx.triggered_freegame;
        book.wincap_triggered = ctx.wincap_triggered;
        final_win
    }

    /// Acceptance test of the active distribution
    fn check_repeat(
        &self,
        ctx: &SpinContext,
        distribution: &Distribution,
        final_win: f64,
    ) -> Option<Rejection> {
        if let Some(target) = distribution.win_criteria {
            if (final_win - target).abs() > 1e-9 {
                return Some(Rejection::WinMismatch {
                    target,
                    actual: final_win,
                });
            }
        }
        if distribution.conditions.force_freegame && !ctx.triggered_freegame {
            return Some(Rejection::FreeGameMissing);
        }
        if ctx.wins.running_bet_win == 0.0 && distribution.criteria != ZERO_CRITERIA {
            return Some(Rejection::ZeroWin);
        }
        None
    }
}
