//! Session controller
//!
//! One run of the tester, from the mode menu to the return to text mode:
//!
//! ```text
//! SelectingProfile -> Drawing -> Tuning -> Exiting
//! ```
//!
//! Nothing touches the flat-panel registers before Drawing has set the mode
//! and drawn the pattern, so failures up to that point need no cleanup.

use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::regs::{DumpRange, ReplicationState};
use super::sequencer::{ApplySettings, RegisterSequencer, Step};
use crate::config::Config;
use crate::fb::palette::init_basic_palette;
use crate::fb::{draw_pattern, writer_for};
use crate::hw::{FpRegisters, MemoryModel, ModeError, Platform, Profile};
use crate::ui::command::HELP;
use crate::ui::{prompt_hex_byte, Command, Console, Key, KeyReader, KeySource};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid selection.")]
    InvalidSelection(Option<u8>),

    #[error("{op} failed: {source}")]
    Mode {
        op: &'static str,
        #[source]
        source: ModeError,
    },

    #[error("Console I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Failed before any register was touched
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, SessionError::InvalidSelection(_) | SessionError::Mode { .. })
    }
}

/// How the session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Saved registers written back
    Restored,
    /// Registers left as last applied
    LeftTuned,
}

/// Session parameters taken from the configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub apply: ApplySettings,
    pub initial: ReplicationState,
    pub dump: DumpRange,
    /// Menu key used instead of asking
    pub preset: Option<u8>,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            apply: ApplySettings::from(&config.apply),
            initial: ReplicationState::new(
                config.apply.initial_low,
                config.apply.initial_high,
                config.apply.stretch_b,
            ),
            dump: DumpRange::new(config.dump.first, config.dump.last),
            preset: config.profile_key(),
        }
    }
}

/// Live state of the tuning phase
#[derive(Debug)]
pub struct Tuning {
    pub profile: Profile,
    pub sequencer: RegisterSequencer,
}

#[derive(Debug)]
enum SessionState {
    SelectingProfile,
    Drawing(Profile),
    Tuning(Tuning),
    Exiting(Tuning, ExitOutcome),
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::SelectingProfile => "selecting profile",
            SessionState::Drawing(_) => "drawing",
            SessionState::Tuning(_) => "tuning",
            SessionState::Exiting(..) => "exiting",
        }
    }
}

pub struct Session<H: Platform, S: KeySource, C: Console> {
    hw: H,
    keys: KeyReader<S>,
    console: C,
    settings: SessionSettings,
}

impl<H: Platform, S: KeySource, C: Console> Session<H, S, C> {
    pub fn new(hw: H, keys: S, console: C, settings: SessionSettings) -> Self {
        Self {
            hw,
            keys: KeyReader::new(keys),
            console,
            settings,
        }
    }

    #[cfg(test)]
    pub fn hw(&self) -> &H {
        &self.hw
    }

    #[cfg(test)]
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Run to completion
    pub fn run(&mut self) -> Result<ExitOutcome, SessionError> {
        let mut state = SessionState::SelectingProfile;
        loop {
            debug!("session: {}", state.name());
            state = match state {
                SessionState::SelectingProfile => SessionState::Drawing(self.select_profile()?),
                SessionState::Drawing(profile) => SessionState::Tuning(self.draw(profile)?),
                SessionState::Tuning(mut tuning) => match self.tune(&mut tuning) {
                    Ok(outcome) => SessionState::Exiting(tuning, outcome),
                    Err(e) => {
                        // Lost the operator: leave the machine as we found it
                        warn!("Tuning aborted: {}", e);
                        tuning.sequencer.restore(&mut FpRegisters::new(&mut self.hw));
                        self.hw.restore_text_mode();
                        return Err(e);
                    }
                },
                SessionState::Exiting(tuning, outcome) => {
                    self.exit(&tuning, outcome)?;
                    return Ok(outcome);
                }
            };
        }
    }

    fn select_profile(&mut self) -> Result<Profile, SessionError> {
        self.console.write_line("")?;
        self.console.write_line("CT65550 V-Replication Live Tester")?;
        for profile in Profile::ALL {
            self.console.write_line(&profile.menu_line())?;
        }
        self.console.write_str("Select mode: ")?;

        let key = match self.settings.preset {
            Some(code) => Key::Char(code),
            None => self.keys.next_key()?,
        };
        let code = match key {
            Key::Char(code) => Some(code),
            Key::Special(_) => None,
        };
        if let Some(code) = code.filter(u8::is_ascii_graphic) {
            self.console.write_str(&(code as char).to_string())?;
        }
        self.console.write_line("")?;

        match code.and_then(Profile::from_key) {
            Some(profile) => {
                info!("Selected profile {} (mode {})", profile.label(), profile.mode());
                Ok(profile)
            }
            None => {
                self.console.write_line("Invalid selection.")?;
                Err(SessionError::InvalidSelection(code))
            }
        }
    }

    fn mode_failure(&mut self, op: &'static str, source: ModeError) -> SessionError {
        let err = SessionError::Mode { op, source };
        let _ = self.console.write_line(&err.to_string());
        err
    }

    fn draw(&mut self, profile: Profile) -> Result<Tuning, SessionError> {
        let mode = profile.mode();
        let layout = match profile.fixed_profile() {
            Some(layout) => layout,
            None => match self.hw.query_profile(mode) {
                Ok(layout) => layout,
                Err(source) => return Err(self.mode_failure("mode query", source)),
            },
        };
        if let Err(source) = self.hw.set_mode(mode) {
            return Err(self.mode_failure("mode set", source));
        }

        if profile.uses_dac_palette() {
            init_basic_palette(&mut self.hw);
        }
        {
            let mut writer = writer_for(&layout, &mut self.hw);
            draw_pattern(writer.as_mut(), layout.width, layout.height);
        }
        if let MemoryModel::BankedFramebuffer(window) = layout.memory_model {
            debug!(
                "Window at {:04X}h: {} bytes, granularity {}, {} bytes/line, LFB 0x{:08X}",
                window.segment,
                window.window_size,
                window.granularity,
                window.bytes_per_scanline,
                window.phys_base
            );
        }
        info!(
            "Pattern drawn: {}x{}x{}bpp {}",
            layout.width,
            layout.height,
            layout.bits_per_pixel,
            layout.memory_model.name()
        );

        let mut regs = FpRegisters::new(&mut self.hw);
        let mut sequencer =
            RegisterSequencer::capture(&mut regs, self.settings.apply, self.settings.initial);
        sequencer.enable_fp_path(&mut regs);
        let ReplicationState { low, high, .. } = self.settings.initial;
        sequencer.apply(&mut regs, low, high);

        Ok(Tuning { profile, sequencer })
    }

    /// Registers are already modified here, so any error must go back
    /// through the restore path in `run`.
    fn tune(&mut self, tuning: &mut Tuning) -> Result<ExitOutcome, SessionError> {
        self.console
            .write_line(&format!("{} {}", tuning.profile.label(), HELP))?;
        let sequencer = &mut tuning.sequencer;
        loop {
            let key = self.keys.next_key()?;
            let Some(command) = Command::from_key(key) else {
                debug!("Ignored key {:?}", key);
                continue;
            };
            debug!("Command {:?}", command);

            let mut regs = FpRegisters::new(&mut self.hw);
            let header = match command {
                Command::Increment => {
                    sequencer.step_fixed(&mut regs, Step::Up);
                    ""
                }
                Command::Decrement => {
                    sequencer.step_fixed(&mut regs, Step::Down);
                    ""
                }
                Command::LowDown => {
                    sequencer.step_low(&mut regs, Step::Down);
                    ""
                }
                Command::LowUp => {
                    sequencer.step_low(&mut regs, Step::Up);
                    ""
                }
                Command::HighDown => {
                    sequencer.step_high(&mut regs, Step::Down);
                    ""
                }
                Command::HighUp => {
                    sequencer.step_high(&mut regs, Step::Up);
                    ""
                }
                Command::ToggleStretch => {
                    sequencer.toggle_stretch(&mut regs);
                    "FR48 toggled "
                }
                Command::RestoreOriginals => {
                    sequencer.restore(&mut regs);
                    "Originals restored "
                }
                Command::Dump => {
                    let dump = sequencer.dump(&mut regs, self.settings.dump);
                    self.console.write_line(&dump.to_string())?;
                    continue;
                }
                Command::WriteRegister => {
                    let index = prompt_hex_byte(&mut self.keys, &mut self.console, "Index")?;
                    let value = prompt_hex_byte(&mut self.keys, &mut self.console, "Value")?;
                    let dump = sequencer.write_direct(&mut regs, index, value, self.settings.dump);
                    self.console.write_line(&dump.to_string())?;
                    continue;
                }
                Command::Quit => return Ok(ExitOutcome::Restored),
                Command::Exit => return Ok(ExitOutcome::LeftTuned),
            };

            let status = sequencer.status(&mut regs);
            self.console.write_line(&format!("{}{}", header, status))?;
        }
    }

    fn exit(&mut self, tuning: &Tuning, outcome: ExitOutcome) -> Result<(), SessionError> {
        if outcome == ExitOutcome::Restored {
            tuning.sequencer.restore(&mut FpRegisters::new(&mut self.hw));
        }
        self.hw.restore_text_mode();
        info!("Session for {} ended: {:?}", tuning.profile.label(), outcome);
        self.console.write_line("Done.")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::hw::ModeId;
    use crate::sim::{SimAdapter, SimEvent};
    use crate::ui::console::BufferConsole;
    use crate::ui::keymapper::ScriptedKeys;

    type TestSession = Session<SimAdapter, ScriptedKeys, BufferConsole>;

    fn session_with(sim: SimAdapter, keys: &[u8]) -> TestSession {
        let settings = SessionSettings::from(&Config::default());
        Session::new(sim, ScriptedKeys::new(keys), BufferConsole::default(), settings)
    }

    fn session(keys: &[u8]) -> TestSession {
        session_with(SimAdapter::new(&SimConfig::default()), keys)
    }

    fn fr_writes(events: &[SimEvent]) -> Vec<(u8, u8)> {
        events
            .iter()
            .filter_map(|e| match *e {
                SimEvent::FrWrite(i, v) => Some((i, v)),
                _ => None,
            })
            .collect()
    }

    fn tracked(sim: &SimAdapter) -> Vec<u8> {
        [0x01, 0x40, 0x41, 0x48, 0x4D, 0x4E].iter().map(|&i| sim.fr(i)).collect()
    }

    #[test]
    fn test_startup_baseline() {
        let mut s = session(b"4x");
        assert_eq!(s.run().unwrap(), ExitOutcome::LeftTuned);

        let sim = s.hw();
        assert_eq!(sim.fr(0x4D), 0x00);
        assert_eq!(sim.fr(0x4E), 0x3F);
        assert_eq!(sim.fr(0x48), 0x17);
        assert_eq!(sim.fr(0x41), 0x07);
        assert_eq!(sim.fr(0x40), 0x3F);
        // FP path bit added to the power-on 0x01
        assert_eq!(sim.fr(0x01), 0x03);
        assert_eq!(sim.mode(), ModeId::TEXT_80X25);
        assert!(s.console().text.contains("640x480 KEYS:"));
        assert!(s.console().text.ends_with("Done.\r\n"));
    }

    #[test]
    fn test_capture_precedes_first_write() {
        let mut s = session(b"1x");
        s.run().unwrap();
        let events = s.hw.take_events();

        let first_write = events.iter().position(|e| matches!(e, SimEvent::FrWrite(..))).unwrap();
        let reads: Vec<u8> = events[..first_write]
            .iter()
            .filter_map(|e| match *e {
                SimEvent::FrRead(i) => Some(i),
                _ => None,
            })
            .collect();
        for index in [0x01, 0x4D, 0x4E, 0x48, 0x41, 0x40] {
            assert!(reads.contains(&index), "FR{:02X} not captured", index);
        }
        assert!(matches!(events[0], SimEvent::ModeSet(ModeId::VGA_320X200X256)));
    }

    #[test]
    fn test_increment_decrement_scenario() {
        let mut s = session(b"4+++-x");
        s.run().unwrap();
        assert_eq!(s.hw().fr(0x4D), 0x22);

        let lines = s.console().lines();
        let status: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("FR4D=")).collect();
        assert_eq!(status.len(), 4);
        assert!(status[0].starts_with("FR4D=11 FR4E=3F FR48=17 FR41=07 FR40=3F"));
        assert!(status[2].starts_with("FR4D=33"));
        assert!(status[3].starts_with("FR4D=22"));
    }

    #[test]
    fn test_arrow_keys_step() {
        let mut s = session(&[b'4', 0xE0, 72, 0xE0, 72, 0x00, 80, b'x']);
        s.run().unwrap();
        assert_eq!(s.hw().fr(0x4D), 0x11);
    }

    #[test]
    fn test_nibble_keys() {
        let mut s = session(b"3HHHLhx");
        s.run().unwrap();
        assert_eq!(s.hw().fr(0x4D), 0x21);
    }

    #[test]
    fn test_toggle_flips_only_designated_bits() {
        let mut s = session(b"5++ex");
        s.run().unwrap();

        let sim = s.hw();
        assert_eq!(sim.fr(0x48) ^ 0x17, 0x05);
        assert_eq!(sim.fr(0x4D), 0x22);
        assert!(s.console().text.contains("FR48 toggled FR4D=22 FR4E=3F FR48=12"));
    }

    #[test]
    fn test_freeform_write_and_dump() {
        let mut s = session(b"4dw4D53x");
        s.run().unwrap();

        let dumps: Vec<&str> = s
            .console()
            .lines()
            .into_iter()
            .filter_map(|l| l.split("FR40..4F: ").nth(1))
            .collect();
        assert_eq!(dumps.len(), 2);
        let before: Vec<&str> = dumps[0].split(' ').collect();
        let after: Vec<&str> = dumps[1].split(' ').collect();
        assert_eq!(after[0x0D], "53");
        for i in (0..16).filter(|&i| i != 0x0D) {
            assert_eq!(before[i], after[i], "FR4{:X} changed", i);
        }
        assert_eq!(s.hw().fr(0x4D), 0x53);
    }

    #[test]
    fn test_freeform_write_reprompts_bad_hex() {
        let mut s = session(b"4wq4D5z53x");
        s.run().unwrap();
        assert_eq!(s.hw().fr(0x4D), 0x53);
        assert_eq!(s.console().text.matches("! hex").count(), 2);
    }

    #[test]
    fn test_quit_restores_everything() {
        let sim = SimAdapter::new(&SimConfig::default());
        let before = tracked(&sim);
        let mut s = session_with(sim, b"2+++eHlw4E00w4011q");
        assert_eq!(s.run().unwrap(), ExitOutcome::Restored);

        let sim = s.hw();
        assert_eq!(tracked(sim), before);
        assert_eq!(sim.mode(), ModeId::TEXT_80X25);
    }

    #[test]
    fn test_restore_order_on_quit() {
        let mut s = session(b"4+q");
        s.run().unwrap();
        let events = s.hw.take_events();
        let text = events.iter().position(|e| *e == SimEvent::TextMode).unwrap();
        let writes = fr_writes(&events[..text]);
        let tail: Vec<u8> = writes[writes.len() - 6..].iter().map(|w| w.0).collect();
        assert_eq!(tail, vec![0x40, 0x41, 0x48, 0x4E, 0x4D, 0x01]);
    }

    #[test]
    fn test_exit_keeps_tuned_registers() {
        let mut s = session(b"4++++X");
        assert_eq!(s.run().unwrap(), ExitOutcome::LeftTuned);
        assert_eq!(s.hw().fr(0x4D), 0x44);
        assert_eq!(s.hw().fr(0x01), 0x03);
        assert_eq!(s.hw().mode(), ModeId::TEXT_80X25);
    }

    #[test]
    fn test_restore_command_keeps_session() {
        let sim = SimAdapter::new(&SimConfig::default());
        let before = tracked(&sim);
        let mut s = session_with(sim, b"1++g");
        let err = s.run().unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
        assert!(s.console().text.contains("Originals restored FR4D=00 FR4E=00 FR48=13"));
        assert_eq!(tracked(s.hw()), before);
    }

    #[test]
    fn test_applies_start_on_fresh_blank() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        // Start inside a blank so the first apply has to skip it
        sim.retrace_mut().set_position(60);
        let mut s = session_with(sim, b"1+-eLx");
        s.run().unwrap();
        let events = s.hw.take_events();

        let mut applies = 0;
        for (i, event) in events.iter().enumerate() {
            if !matches!(event, SimEvent::FrWrite(0x4D, _)) {
                continue;
            }
            applies += 1;
            let polls: Vec<bool> = events[..i]
                .iter()
                .rev()
                .map_while(|e| match *e {
                    SimEvent::RetracePoll(in_blank) => Some(in_blank),
                    _ => None,
                })
                .collect();
            assert_eq!(polls.first(), Some(&true));
            assert!(polls.contains(&false));

            let order: Vec<u8> = fr_writes(&events[i..i + 5]).iter().map(|w| w.0).collect();
            assert_eq!(order, vec![0x4D, 0x4E, 0x48, 0x41, 0x40]);
        }
        assert_eq!(applies, 5);
    }

    #[test]
    fn test_invalid_profile_touches_nothing() {
        let mut s = session(b"9");
        let err = s.run().unwrap_err();
        assert!(matches!(err, SessionError::InvalidSelection(Some(b'9'))));
        assert!(err.is_setup_failure());
        assert!(s.hw.take_events().is_empty());
        assert!(s.console().text.contains("Invalid selection."));
    }

    #[test]
    fn test_special_key_is_invalid_profile() {
        let mut s = session(&[0xE0, 72]);
        assert!(matches!(s.run(), Err(SessionError::InvalidSelection(None))));
    }

    #[test]
    fn test_mode_query_failure() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        sim.fail_query(ModeId::VESA_640X480X256);
        let mut s = session_with(sim, b"4");
        let err = s.run().unwrap_err();

        assert!(matches!(err, SessionError::Mode { op: "mode query", .. }));
        assert!(err.is_setup_failure());
        assert!(s.hw.take_events().is_empty());
        assert!(s.console().text.contains("mode query failed: VBE 0x4F01"));
    }

    #[test]
    fn test_mode_set_failure() {
        let mut sim = SimAdapter::new(&SimConfig::default());
        sim.fail_set(ModeId::EGA_640X350X16);
        let mut s = session_with(sim, b"2");
        let err = s.run().unwrap_err();

        assert!(matches!(err, SessionError::Mode { op: "mode set", .. }));
        assert!(fr_writes(&s.hw.take_events()).is_empty());
    }

    #[test]
    fn test_lost_input_restores_and_leaves_graphics() {
        let sim = SimAdapter::new(&SimConfig::default());
        let before = tracked(&sim);
        let mut s = session_with(sim, b"3++e");
        let err = s.run().unwrap_err();

        assert!(!err.is_setup_failure());
        assert_eq!(tracked(s.hw()), before);
        assert_eq!(s.hw().mode(), ModeId::TEXT_80X25);
    }

    /// Console that fails on any write containing `marker`
    struct BrokenConsole {
        marker: &'static str,
    }

    impl Console for BrokenConsole {
        fn write_str(&mut self, s: &str) -> io::Result<()> {
            if s.contains(self.marker) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_console_failure_after_setup_restores() {
        let sim = SimAdapter::new(&SimConfig::default());
        let before = tracked(&sim);
        let settings = SessionSettings::from(&Config::default());
        let console = BrokenConsole { marker: "KEYS:" };
        let mut s = Session::new(sim, ScriptedKeys::new(b"4x"), console, settings);

        let err = s.run().unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
        assert!(!err.is_setup_failure());
        assert_eq!(tracked(s.hw()), before);
        assert_eq!(s.hw().mode(), ModeId::TEXT_80X25);
    }

    #[test]
    fn test_console_failure_on_status_restores() {
        let sim = SimAdapter::new(&SimConfig::default());
        let before = tracked(&sim);
        let settings = SessionSettings::from(&Config::default());
        let console = BrokenConsole { marker: "FR4D=11" };
        let mut s = Session::new(sim, ScriptedKeys::new(b"2+x"), console, settings);

        assert!(matches!(s.run(), Err(SessionError::Io(_))));
        assert_eq!(tracked(s.hw()), before);
        assert_eq!(s.hw().mode(), ModeId::TEXT_80X25);
    }

    #[test]
    fn test_preset_profile_skips_prompt() {
        let mut config = Config::default();
        config.profile = Some(2);
        let settings = SessionSettings::from(&config);
        let sim = SimAdapter::new(&SimConfig::default());
        let mut s = Session::new(sim, ScriptedKeys::new(b"x"), BufferConsole::default(), settings);

        assert_eq!(s.run().unwrap(), ExitOutcome::LeftTuned);
        assert!(s.console().text.contains("Select mode: 2\r\n"));
        assert_eq!(s.keys.source().remaining(), 0);
    }

    #[test]
    fn test_pattern_visible_before_tuning() {
        let mut s = session(b"");
        let tuning = s.draw(Profile::Ega640x350).unwrap();
        assert_eq!(tuning.sequencer.state().packed(), 0x00);

        let sim = s.hw();
        assert_eq!(sim.mode(), ModeId::EGA_640X350X16);
        let row0 = sim.row(0);
        assert!(row0[..20].iter().all(|&c| c == 15));
        assert!(row0[20..].iter().all(|&c| c == 1));
        assert!(sim.row(1).iter().all(|&c| c == 2));
    }
}
