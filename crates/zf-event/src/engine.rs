//! ZoundEngine: playback orchestrator
//!
//! Owns every live token, the voice pool, culling/cooldown state and the
//! missing-zound registry. Single-threaded: play requests and `tick` run on
//! the same logical thread, in any interleaving.
//!
//! ## Play request
//!
//! ```text
//! cooldown ─▶ chance roll ─▶ voice + handler (children built here)
//!     ─▶ register (live list, culling group, evict oldest) ─▶ notify ─▶ start
//! ```
//!
//! ## Tick
//!
//! Every token live at the start of the tick is advanced by the same `dt`.
//! Tokens killed during the pass are retired after it (culling group,
//! voice back to the pool, live list).

use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use zf_core::{TagId, ValueRange, ZoundId};

use crate::args::PlayArgs;
use crate::config::{EngineConfig, PlaybackContext};
use crate::culling::CullingController;
use crate::diagnostic::{DiagnosticQueue, PlaybackDiagnostic};
use crate::handler::{
    ChildSlot, Handler, KlipHandler, KlipStart, MIN_PITCH, ParentParams, ZequenceHandler,
    resolve_child_params, select_entries, zequence_mix,
};
use crate::library::SharedLibrary;
use crate::missing::MissingZoundRegistry;
use crate::resource::ResourceProvider;
use crate::token::{Token, TokenCreated, TokenId, TokenSetup, UpdateDisposition};
use crate::voice::{Voice, VoicePool, VoicePoolStats};
use crate::zound::{PlayMode, Zequence, Zound, ZoundKind};
use crate::{ZoundError, ZoundResult};

pub struct ZoundEngine {
    config: EngineConfig,
    library: SharedLibrary,
    resources: Box<dyn ResourceProvider>,
    pool: VoicePool,
    /// Live tokens by ID
    tokens: HashMap<TokenId, Token>,
    /// Live token IDs in creation order
    live: Vec<TokenId>,
    culling: CullingController,
    missing: MissingZoundRegistry,
    diagnostics: DiagnosticQueue,
    subscribers: Vec<Sender<TokenCreated>>,
    rng: StdRng,
    context: PlaybackContext,
    global_volume: f32,
    /// Engine time (seconds)
    time: f64,
    next_token_id: u64,
}

impl ZoundEngine {
    pub fn new(
        config: EngineConfig,
        library: SharedLibrary,
        resources: impl ResourceProvider + 'static,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let context = PlaybackContext::default();
        Self {
            global_volume: config.volume_for(context),
            missing: MissingZoundRegistry::new(config.missing_zound_expiry_secs),
            config,
            library,
            resources: Box::new(resources),
            pool: VoicePool::new(),
            tokens: HashMap::new(),
            live: Vec::new(),
            culling: CullingController::new(),
            diagnostics: DiagnosticQueue::default(),
            subscribers: Vec::new(),
            rng,
            context,
            time: 0.0,
            next_token_id: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn library(&self) -> &SharedLibrary {
        &self.library
    }

    /// Engine time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn context(&self) -> PlaybackContext {
        self.context
    }

    pub fn set_context(&mut self, context: PlaybackContext) {
        self.context = context;
        self.global_volume = self.config.volume_for(context);
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    /// Receive a `TokenCreated` for every new token
    pub fn subscribe(&mut self) -> Receiver<TokenCreated> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAY REQUESTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Play a zound; `None` when suppressed (cooldown, chance) or unknown
    pub fn play(&mut self, zound: ZoundId, args: PlayArgs) -> Option<TokenId> {
        self.play_request(zound, &args)
    }

    /// Play by (normalized) name, trying `args.fallback` once on a miss
    pub fn play_by_name(&mut self, name: &str, args: PlayArgs) -> Option<TokenId> {
        if let Some(id) = self.resolve_name(name) {
            return self.play_request(id, &args);
        }
        let fallback = args.fallback.as_deref()?;
        let id = self.resolve_name(fallback)?;
        log::debug!("Playing fallback '{fallback}' for '{name}'");
        self.play_request(id, &args)
    }

    fn resolve_name(&mut self, name: &str) -> Option<ZoundId> {
        let id = self.library.read().id_for_name(name);
        if id.is_none() {
            log::warn!("Zound '{name}' not found");
            self.missing.record(name, self.time);
            self.diagnostics.push(PlaybackDiagnostic::MissingZound {
                name: name.to_string(),
            });
        }
        id
    }

    fn play_request(&mut self, zound_id: ZoundId, args: &PlayArgs) -> Option<TokenId> {
        let zound = self.library.read().get(zound_id).cloned();
        let Some(zound) = zound else {
            log::warn!("Play request for unknown {zound_id}");
            self.diagnostics.push(PlaybackDiagnostic::UnknownZound(zound_id));
            return None;
        };

        let trigger_time = self.time + f64::from(args.delay_secs);
        if !args.ignore_cooldown
            && self
                .culling
                .is_cooling_down(zound_id, trigger_time, self.config.cooldown_secs)
        {
            log::debug!(
                "{} suppressed by cooldown ({:.3}s left)",
                zound.name,
                self.remaining_cooldown(zound_id)
            );
            return None;
        }

        let chance = args.chance.unwrap_or(zound.chance);
        if !self.roll_chance(chance) {
            log::debug!("{} skipped by chance {chance:.2}", zound.name);
            return None;
        }

        let average = args.use_average_values;
        let volume = args
            .volume
            .unwrap_or_else(|| self.sample(zound.volume, average));
        let pitch = args
            .pitch
            .unwrap_or_else(|| self.sample(zound.pitch, average))
            .max(MIN_PITCH);
        let solo_muted = !args.bypass_global_solo && !self.library.read().solo_allows(zound_id);

        let id = self.allocate_token_id();
        let mut voice = self.pool.request();
        voice.set_route(zound.output_route);

        let parent = ParentParams {
            volume,
            pitch,
            chance,
        };
        let (handler, duration) = self.build_handler(id, &zound, args, parent);

        let setup = TokenSetup {
            id,
            zound_id,
            zound_name: zound.name.clone(),
            tags: zound.tags.clone(),
            volume,
            pitch,
            chance,
            delay: args.delay_secs,
            duration_override: args.duration_override,
            parent: args.parent,
            ignore_cooldown: args.ignore_cooldown,
            solo_muted,
            created_at: self.time,
        };
        let mut token = Token::new(setup, handler, voice);
        token.set_prepared_duration(duration);
        token.fade_in(args.fade_in_secs);
        token.sync_voice(self.global_volume);

        log::debug!(
            "Play {} as {id} ({}, {:.3}s)",
            zound.name,
            token.handler().kind_name(),
            token.total_duration()
        );

        let cap = self.config.max_played_zound_instances;
        let evicted = self.culling.admit(zound_id, id, cap);
        self.tokens.insert(id, token);
        self.live.push(id);

        let fade = self.config.culling_fade_secs;
        for oldest in evicted {
            log::debug!("Culling {oldest} of {} (cap {cap})", zound.name);
            self.with_token(oldest, |engine, token| {
                engine.fade_and_kill_token(token, fade)
            });
        }

        self.notify(TokenCreated {
            token: id,
            zound: zound_id,
            parent: args.parent,
            created_at: self.time,
        });

        if args.start_immediately {
            // Failures are already logged and recorded
            let _ = self.start(id);
        }
        Some(id)
    }

    fn build_handler(
        &mut self,
        id: TokenId,
        zound: &Zound,
        args: &PlayArgs,
        parent: ParentParams,
    ) -> (Handler, f32) {
        match &zound.kind {
            ZoundKind::Klip(klip) | ZoundKind::Music(klip) => {
                self.klip_handler(KlipHandler::from_klip(klip), parent.pitch)
            }
            ZoundKind::Zequence(zequence) | ZoundKind::Randomizer(zequence) => {
                match &zequence.rendered {
                    Some(rendered) => self
                        .klip_handler(KlipHandler::new(rendered.clone(), 0.0, None), parent.pitch),
                    None => self.build_zequence(id, zound, zequence, args, parent),
                }
            }
        }
    }

    fn klip_handler(&self, mut handler: KlipHandler, pitch: f32) -> (Handler, f32) {
        let duration = handler.prepare_duration(self.resources.as_ref(), pitch);
        (Handler::Klip(handler), duration)
    }

    /// Select entries and spawn (unstarted) children
    fn build_zequence(
        &mut self,
        id: TokenId,
        zound: &Zound,
        zequence: &Zequence,
        args: &PlayArgs,
        parent: ParentParams,
    ) -> (Handler, f32) {
        let audition = args
            .audition
            .filter(|entry| entry.zequence == zound.id)
            .map(|entry| entry.entry);

        // Cursors live on the authoring data
        let selected = {
            let mut library = self.library.write();
            let rng = &mut self.rng;
            match library.get_mut(zound.id).and_then(Zound::as_zequence_mut) {
                Some(live) => {
                    if matches!(zound.kind, ZoundKind::Randomizer(_)) {
                        live.mode = PlayMode::Randomizer;
                    }
                    select_entries(live, audition, &mut || rng.random::<f32>())
                }
                None => Vec::new(),
            }
        };
        log::debug!("{} selected entries {selected:?}", zound.name);

        let mut handler = ZequenceHandler::new(zound.id);
        for index in selected {
            let Some(entry) = zequence.entries.get(index) else {
                continue;
            };
            let child_id = entry.zound;
            if child_id == zound.id || self.library.read().contains(child_id, zound.id) {
                log::error!(
                    "{}: entry {index} ({child_id}) leads back to {}, skipping",
                    zound.name,
                    zound.id
                );
                self.diagnostics.push(PlaybackDiagnostic::CycleDetected {
                    parent: zound.id,
                    child: child_id,
                });
                continue;
            }

            let child = self.library.read().get(child_id).cloned();
            let Some(child) = child else {
                log::warn!("{}: entry {index} references unknown {child_id}", zound.name);
                self.diagnostics.push(PlaybackDiagnostic::UnknownZound(child_id));
                continue;
            };

            let average = args.use_average_values;
            let params = resolve_child_params(entry, &child, parent, |range| {
                self.sample(range, average)
            });
            let child_args = PlayArgs {
                volume: Some(params.volume),
                pitch: Some(params.pitch),
                chance: Some(params.chance),
                delay_secs: params.delay,
                duration_override: None,
                fade_in_secs: args.fade_in_secs,
                start_immediately: false,
                ignore_cooldown: args.ignore_cooldown,
                use_average_values: average,
                bypass_global_solo: true,
                audition: args.audition,
                fallback: None,
                parent: Some(id),
            };
            if let Some(token) = self.play_request(child_id, &child_args) {
                handler.push_child(ChildSlot {
                    token,
                    entry: index,
                });
            }
        }

        let duration = handler
            .children()
            .iter()
            .filter_map(|slot| self.tokens.get(&slot.token))
            .map(Token::span)
            .fold(0.0, f32::max);
        (Handler::Zequence(handler), duration)
    }

    /// `U(0,1) <= chance`; a non-positive chance never plays
    fn roll_chance(&mut self, chance: f32) -> bool {
        chance > 0.0 && self.rng.random::<f32>() <= chance
    }

    fn sample(&mut self, range: ValueRange, average: bool) -> f32 {
        if average {
            range.midpoint()
        } else if range.min >= range.max {
            range.min
        } else {
            range.lerp(self.rng.random::<f32>())
        }
    }

    fn allocate_token_id(&mut self) -> TokenId {
        self.next_token_id += 1;
        TokenId(self.next_token_id)
    }

    fn notify(&mut self, event: TokenCreated) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TOKEN OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn start(&mut self, id: TokenId) -> ZoundResult<()> {
        self.operate(id, Self::start_token)
    }

    pub fn pause(&mut self, id: TokenId) -> ZoundResult<()> {
        self.operate(id, |engine, token| engine.pause_token(token, None))
    }

    pub fn resume(&mut self, id: TokenId) -> ZoundResult<()> {
        self.operate(id, |engine, token| engine.resume_token(token, None))
    }

    /// Ramp to silence over `secs`, then pause
    pub fn pause_with_fade(&mut self, id: TokenId, secs: f32) -> ZoundResult<()> {
        self.operate(id, |engine, token| engine.pause_token(token, Some(secs)))
    }

    /// Resume and ramp back in over `secs`
    pub fn resume_with_fade(&mut self, id: TokenId, secs: f32) -> ZoundResult<()> {
        self.operate(id, |engine, token| engine.resume_token(token, Some(secs)))
    }

    pub fn kill(&mut self, id: TokenId) -> ZoundResult<()> {
        self.operate(id, |engine, token| {
            engine.kill_token(token);
            Ok(())
        })
    }

    pub fn fade_and_kill(&mut self, id: TokenId, secs: f32) -> ZoundResult<()> {
        self.operate(id, |engine, token| {
            engine.fade_and_kill_token(token, secs);
            Ok(())
        })
    }

    /// Fade out every live token carrying `tag`; returns how many
    pub fn fade_and_kill_tagged(&mut self, tag: TagId, secs: f32) -> usize {
        let ids = self.tokens_with_tag(tag);
        for id in &ids {
            self.with_token(*id, |engine, token| engine.fade_and_kill_token(token, secs));
        }
        ids.len()
    }

    /// Kill everything now; `cleanup` also destroys pooled voices
    pub fn stop_all(&mut self, cleanup: bool) {
        log::debug!("Stopping {} tokens", self.live.len());
        for id in self.live.clone() {
            self.with_token(id, |engine, token| engine.kill_token(token));
        }
        self.retire_killed();
        self.culling.clear_groups();
        self.pool.stop_all(cleanup);
    }

    /// Take a token out of the arena for the duration of `op`
    fn with_token<R>(
        &mut self,
        id: TokenId,
        op: impl FnOnce(&mut Self, &mut Token) -> R,
    ) -> Option<R> {
        let mut token = self.tokens.remove(&id)?;
        let result = op(self, &mut token);
        self.tokens.insert(id, token);
        Some(result)
    }

    fn operate(
        &mut self,
        id: TokenId,
        op: impl FnOnce(&mut Self, &mut Token) -> ZoundResult<()>,
    ) -> ZoundResult<()> {
        let result = self
            .with_token(id, op)
            .ok_or(ZoundError::TokenNotFound(id))?;
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn for_each_child(&mut self, token: &Token, mut op: impl FnMut(&mut Self, &mut Token)) {
        for child in token.handler().child_tokens() {
            self.with_token(child, &mut op);
        }
    }

    fn report(&mut self, err: &ZoundError) {
        log::warn!("{err}");
        if let ZoundError::InvalidTokenOperation {
            token,
            operation,
            state,
        } = err
        {
            self.diagnostics
                .push(PlaybackDiagnostic::InvalidTokenOperation {
                    token: *token,
                    operation: *operation,
                    state: *state,
                });
        }
    }

    fn start_token(&mut self, token: &mut Token) -> ZoundResult<()> {
        let was_started = token.is_started();
        token.start()?;
        if !was_started && token.delay_elapsed() {
            self.on_delay_elapsed(token);
        }
        Ok(())
    }

    fn pause_token(&mut self, token: &mut Token, fade: Option<f32>) -> ZoundResult<()> {
        match fade {
            Some(secs) => token.pause_with_fade(secs)?,
            None => token.pause()?,
        }
        self.for_each_child(token, |engine, child| {
            if child.is_started() && !child.state().is_ending() {
                if let Err(err) = engine.pause_token(child, fade) {
                    engine.report(&err);
                }
            }
        });
        Ok(())
    }

    fn resume_token(&mut self, token: &mut Token, fade: Option<f32>) -> ZoundResult<()> {
        // Never started: resuming is starting
        if !token.is_started() && !token.state().is_ending() {
            if let Some(secs) = fade {
                self.fade_in_token(token, secs);
            }
            return self.start_token(token);
        }
        match fade {
            Some(secs) => token.resume_with_fade(secs)?,
            None => token.resume()?,
        }
        self.for_each_child(token, |engine, child| {
            if child.is_started() && !child.state().is_ending() {
                if let Err(err) = engine.resume_token(child, fade) {
                    engine.report(&err);
                }
            }
        });
        Ok(())
    }

    fn fade_in_token(&mut self, token: &mut Token, secs: f32) {
        token.fade_in(secs);
        self.for_each_child(token, |engine, child| engine.fade_in_token(child, secs));
    }

    fn kill_token(&mut self, token: &mut Token) {
        self.for_each_child(token, |engine, child| engine.kill_token(child));
        token.kill();
        self.culling.remove(token.zound_id(), token.id());
    }

    fn fade_and_kill_token(&mut self, token: &mut Token, secs: f32) {
        // Nothing audible yet
        if !token.is_play_ready() {
            self.kill_token(token);
            return;
        }
        self.for_each_child(token, |engine, child| engine.fade_and_kill_token(child, secs));
        token.fade_and_kill(secs);
        self.culling.remove(token.zound_id(), token.id());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAY-READY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Delay elapsed: cooldown gate, then start audible playback
    fn on_delay_elapsed(&mut self, token: &mut Token) {
        if token.gate_passed() {
            return;
        }
        token.pass_gate();

        let zound = token.zound_id();
        if !token.ignores_cooldown()
            && self
                .culling
                .is_cooling_down(zound, self.time, self.config.cooldown_secs)
        {
            log::debug!("{} suppressed by cooldown at play time", token.zound_name());
            self.kill_token(token);
            return;
        }
        self.culling.record_play(zound, self.time);
        self.on_play_ready(token);
    }

    fn on_play_ready(&mut self, token: &mut Token) {
        if token.is_killed() {
            return;
        }

        let outcome = match &mut token.handler {
            Handler::Klip(klip) => Some(klip.try_start(&mut token.voice, self.resources.as_ref())),
            Handler::Zequence(_) => None,
        };

        match outcome {
            Some(KlipStart::Started { length_secs }) => {
                token.set_prepared_duration(length_secs / token.pitch());
                token.mark_play_ready();
            }
            Some(KlipStart::Waiting) => {
                log::trace!("{} waiting for its clip", token.zound_name());
            }
            Some(KlipStart::Unavailable) => {
                if let Some(klip) = token.handler().as_klip() {
                    log::error!(
                        "{}: clip '{}' unavailable, playing as silence",
                        token.zound_name(),
                        klip.clip()
                    );
                    self.diagnostics
                        .push(PlaybackDiagnostic::ResourceUnavailable {
                            zound: token.zound_id(),
                            clip: klip.clip().clone(),
                        });
                }
                token.set_prepared_duration(0.0);
                token.mark_play_ready();
            }
            None => {
                token.mark_play_ready();
                self.for_each_child(token, |engine, child| {
                    if child.state().is_ending() {
                        return;
                    }
                    if let Err(err) = engine.start_token(child) {
                        engine.report(&err);
                    }
                });
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TICK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Advance playback by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.time += f64::from(dt);
        self.global_volume = self.config.volume_for(self.context);
        self.missing.prune(self.time);

        // Tokens created during the pass start advancing next tick
        for id in self.live.clone() {
            self.with_token(id, |engine, token| engine.update_token(token, dt));
        }
        self.retire_killed();
    }

    fn update_token(&mut self, token: &mut Token, dt: f32) {
        if !token.state().is_advancing() {
            return;
        }

        let mut disposition = token.advance_fade(dt);
        if disposition == UpdateDisposition::Continue {
            disposition = self.advance_handler(token, dt);
        }

        match disposition {
            UpdateDisposition::Continue => {}
            UpdateDisposition::NeedsKill => self.kill_token(token),
            UpdateDisposition::NeedsPause => {
                if let Err(err) = self.pause_token(token, None) {
                    self.report(&err);
                }
            }
        }

        if !token.is_killed() {
            token.sync_voice(self.global_volume);
        }
    }

    fn advance_handler(&mut self, token: &mut Token, dt: f32) -> UpdateDisposition {
        if token.is_play_ready() {
            token.advance_elapsed(dt);
        } else {
            if !token.gate_passed() {
                if token.advance_delay(dt) {
                    self.on_delay_elapsed(token);
                }
            } else {
                // Clip still loading
                self.on_play_ready(token);
            }
            if token.is_killed() || !token.is_play_ready() {
                return UpdateDisposition::Continue;
            }
        }

        if token.handler().as_zequence().is_some() {
            return self.update_zequence(token, dt);
        }
        if token.reached_end(dt) {
            UpdateDisposition::NeedsKill
        } else {
            UpdateDisposition::Continue
        }
    }

    /// Track child durations and push envelope/solo/mute state down
    fn update_zequence(&mut self, token: &mut Token, dt: f32) -> UpdateDisposition {
        let slots: Vec<ChildSlot> = token.handler().children().to_vec();

        let mut span = 0.0f32;
        let mut waiting = false;
        for slot in &slots {
            if let Some(child) = self.tokens.get(&slot.token) {
                span = span.max(child.span());
                waiting |= !child.is_killed() && !child.is_play_ready();
            }
        }
        token.extend_duration(span);

        let total = token.total_duration();
        let t = if total > 0.0 {
            (token.elapsed() / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mixes = {
            let library = self.library.read();
            match library.get(token.zound_id()).and_then(Zound::as_zequence) {
                Some(zequence) => zequence_mix(
                    &slots,
                    zequence,
                    &library,
                    t,
                    token.inherited_volume(),
                    token.is_muted(),
                ),
                None => Vec::new(),
            }
        };
        for mix in mixes {
            if let Some(child) = self.tokens.get_mut(&mix.token) {
                child.parent_volume = mix.gain;
                child.parent_muted = mix.muted;
            }
        }

        if !waiting && token.reached_end(dt) {
            UpdateDisposition::NeedsKill
        } else {
            UpdateDisposition::Continue
        }
    }

    /// Collect-then-remove every killed token
    fn retire_killed(&mut self) {
        let killed: HashSet<TokenId> = self
            .live
            .iter()
            .copied()
            .filter(|id| self.tokens.get(id).is_none_or(Token::is_killed))
            .collect();
        if killed.is_empty() {
            return;
        }

        for id in &killed {
            if let Some(token) = self.tokens.remove(id) {
                self.culling.remove(token.zound_id(), *id);
                self.pool.release(token.into_voice());
            }
        }
        self.live.retain(|id| !killed.contains(id));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    /// Live tokens in creation order
    pub fn tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        self.live.iter().filter_map(|id| self.tokens.get(id))
    }

    /// Live (not killed) tokens of one zound
    pub fn tokens_for(&self, zound: ZoundId) -> Vec<TokenId> {
        self.tokens()
            .filter(|token| token.zound_id() == zound && !token.is_killed())
            .map(Token::id)
            .collect()
    }

    pub fn tokens_with_tag(&self, tag: TagId) -> Vec<TokenId> {
        self.tokens()
            .filter(|token| token.has_tag(tag) && !token.is_killed())
            .map(Token::id)
            .collect()
    }

    /// Culling group members, oldest first
    pub fn culling_group(&self, zound: ZoundId) -> Vec<TokenId> {
        self.culling.group(zound).collect()
    }

    /// Children of a composite that are still in the arena
    pub fn children_of(&self, id: TokenId) -> Vec<TokenId> {
        self.tokens
            .get(&id)
            .map(|token| {
                token
                    .handler()
                    .child_tokens()
                    .into_iter()
                    .filter(|child| self.tokens.contains_key(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Voices currently bound to a clip, for the renderer
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> + '_ {
        self.tokens()
            .map(Token::voice)
            .filter(|voice| voice.is_playing())
    }

    pub fn voice_stats(&self) -> VoicePoolStats {
        self.pool.stats()
    }

    /// Seconds until `zound` may trigger again
    pub fn remaining_cooldown(&self, zound: ZoundId) -> f32 {
        self.culling
            .remaining_cooldown(zound, self.time, self.config.cooldown_secs)
    }

    /// Names whose lookup failed recently
    pub fn missing_zounds(&self) -> Vec<String> {
        self.missing.names()
    }

    pub fn pending_diagnostics(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn take_diagnostics(&mut self) -> Vec<PlaybackDiagnostic> {
        self.diagnostics.take()
    }
}
