//! The console turn loop.
//!
//! A `Session` reads commands line by line, applies them to a `Game` and
//! writes the board and messages back. Input and output are generic so a
//! session can be scripted with `Cursor` and `Vec<u8>`.

use std::io::{self, BufRead, Write};

use tracing::{debug, info, warn};

use crate::ai::{AiEngine, MinimaxAi};
use crate::cli::parser::{Command, parse_command};
use crate::cli::render::{self, HELP_TEXT, RenderOptions};
use crate::config::GameConfig;
use crate::engine::game::{Game, MoveRequest};
use crate::engine::san;
use crate::engine::types::{ChessError, Color, GameResult, Square};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// An interactive game over a line-based reader and a writer.
pub struct Session<R, W> {
    game: Game,
    config: GameConfig,
    ai: MinimaxAi,
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Start a session from the standard starting position.
    pub fn new(config: GameConfig, input: R, out: W) -> Self {
        Self::with_game(Game::new(), config, input, out)
    }

    /// Start a session from an existing game.
    pub fn with_game(mut game: Game, config: GameConfig, input: R, out: W) -> Self {
        let ai = match config.ai_timeout() {
            Some(limit) => MinimaxAi::with_time_limit(limit),
            None => MinimaxAi::new(),
        };
        if config.vs_ai {
            game.ai_difficulty = Some(config.difficulty);
            let computer = format!("Computer ({})", config.difficulty);
            let (human, ai) = match config.human_color {
                Color::White => (&mut game.white_player, &mut game.black_player),
                Color::Black => (&mut game.black_player, &mut game.white_player),
            };
            *human = "You".to_string();
            *ai = computer;
        }
        Self {
            game,
            config,
            ai,
            input,
            out,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Consume the session, returning the writer.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Play until the game ends, the user quits or input runs out.
    /// Returns the result at that point (`Ongoing` after a quit).
    pub fn run(&mut self) -> io::Result<GameResult> {
        info!(
            game = %self.game.id,
            vs_ai = self.config.vs_ai,
            difficulty = %self.config.difficulty,
            "session started"
        );
        self.banner()?;
        self.show_board()?;

        loop {
            if self.game.is_game_over() {
                let result = self.game.result();
                writeln!(self.out, "Game over: {}", result.describe())?;
                if let Some(winner) = result.winner() {
                    writeln!(self.out, "Winner: {}", self.game.player(winner))?;
                }
                break;
            }

            if self.is_ai_turn() {
                self.play_ai_turn()?;
                continue;
            }

            let Some(line) = self.prompt(&format!("{} to move> ", self.game.side_to_move().name()))?
            else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let cmd = match parse_command(&line) {
                Ok(cmd) => cmd,
                Err(err) => {
                    writeln!(self.out, "Error: {err}")?;
                    continue;
                }
            };
            if self.dispatch(cmd)? == Flow::Quit {
                writeln!(self.out, "Goodbye.")?;
                break;
            }
        }

        self.out.flush()?;
        let result = self.game.result();
        info!(game = %self.game.id, %result, plies = self.game.history().len(), "session ended");
        Ok(result)
    }

    // -----------------------------------------------------------------
    // Turn handling
    // -----------------------------------------------------------------

    fn ai_color(&self) -> Option<Color> {
        self.config.vs_ai.then_some(!self.config.human_color)
    }

    fn is_ai_turn(&self) -> bool {
        self.ai_color() == Some(self.game.side_to_move())
    }

    /// The human on turn: the side to move, or the configured colour in AI mode.
    fn human(&self) -> Color {
        if self.config.vs_ai {
            self.config.human_color
        } else {
            self.game.side_to_move()
        }
    }

    fn play_ai_turn(&mut self) -> io::Result<()> {
        writeln!(self.out, "Computer is thinking...")?;
        self.out.flush()?;
        let mv = self
            .ai
            .best_move(&self.game, self.config.difficulty)
            .map_err(io::Error::other)?;
        let notation = self.game.make_move(mv).map_err(io::Error::other)?;
        writeln!(self.out, "Computer plays {notation} ({mv})")?;
        self.show_board()
    }

    fn dispatch(&mut self, cmd: Command) -> io::Result<Flow> {
        match cmd {
            Command::Move(req) => self.play_human_move(req)?,
            Command::Undo => self.undo()?,
            Command::History => {
                let text = render::render_history(self.game.history());
                if text.is_empty() {
                    writeln!(self.out, "No moves yet.")?;
                } else {
                    writeln!(self.out, "{text}")?;
                }
            }
            Command::Moves(sq) => self.show_moves_from(sq)?,
            Command::Draw => self.draw()?,
            Command::Resign => {
                let by = self.human();
                let resigned = self.game.resign(by);
                self.report(resigned)?;
            }
            Command::Hint => self.hint()?,
            Command::Board => self.show_board()?,
            Command::Help => writeln!(self.out, "{HELP_TEXT}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn play_human_move(&mut self, req: MoveRequest) -> io::Result<()> {
        let mover = self.game.side_to_move();
        let played = self
            .game
            .resolve_request(&req)
            .and_then(|mv| self.game.make_move(mv));
        match played {
            Ok(notation) => {
                writeln!(self.out, "{} plays {notation}", mover.name())?;
                self.show_board()
            }
            Err(err) => self.report(Err(err)),
        }
    }

    /// In AI mode, take back the computer's reply and the human's move so
    /// the human is to move again. One ply otherwise.
    fn undo(&mut self) -> io::Result<()> {
        let plies = if self.config.vs_ai && self.game.side_to_move() == self.config.human_color {
            2
        } else {
            1
        };
        if self.game.history().len() < plies {
            return self.report(Err(ChessError::NothingToUndo));
        }
        for _ in 0..plies {
            if let Err(err) = self.game.undo_move() {
                return self.report(Err(err));
            }
        }
        writeln!(self.out, "Took back {plies} half-move(s).")?;
        self.show_board()
    }

    fn draw(&mut self) -> io::Result<()> {
        let me = self.human();
        if self.game.pending_draw_offer() == Some(!me) {
            let accepted = self.game.accept_draw(me);
            return self.report(accepted);
        }
        if let Err(err) = self.game.offer_draw(me) {
            return self.report(Err(err));
        }

        match self.ai_color() {
            Some(ai) => {
                if self.ai.accepts_draw(self.game.position(), ai) {
                    let accepted = self.game.accept_draw(ai);
                    self.report(accepted)?;
                    writeln!(self.out, "The computer accepts the draw.")
                } else {
                    writeln!(self.out, "The computer declines the draw offer.")
                }
            }
            None => {
                let opponent = !me;
                let question = format!(
                    "{} offers a draw. {}, accept? [y/N]> ",
                    me.name(),
                    opponent.name()
                );
                let answer = self.prompt(&question)?.unwrap_or_default();
                if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "draw") {
                    let accepted = self.game.accept_draw(opponent);
                    self.report(accepted)
                } else {
                    writeln!(self.out, "Draw declined.")
                }
            }
        }
    }

    fn hint(&mut self) -> io::Result<()> {
        if self.game.is_game_over() {
            return Ok(());
        }
        match self.ai.hint(&self.game, self.config.difficulty) {
            Ok(mv) => {
                let legal = self.game.legal_moves();
                let notation = san::move_to_san(self.game.position(), mv, &legal);
                writeln!(self.out, "Hint: {notation} ({mv})")
            }
            Err(err) => self.report(Err(err)),
        }
    }

    fn show_moves_from(&mut self, sq: Square) -> io::Result<()> {
        let moves = self.game.legal_moves_from(sq);
        if moves.is_empty() {
            return writeln!(self.out, "No legal moves from {sq}.");
        }
        let opts = self.render_options().with_highlights(moves.iter().map(|m| m.to));
        write!(self.out, "{}", render::render_board(self.game.position(), &opts))?;

        let mut targets: Vec<String> = Vec::with_capacity(moves.len());
        for mv in &moves {
            let name = mv.to.to_algebraic();
            if !targets.contains(&name) {
                targets.push(name);
            }
        }
        writeln!(self.out, "Legal moves from {sq}: {}", targets.join(", "))
    }

    // -----------------------------------------------------------------
    // Output helpers
    // -----------------------------------------------------------------

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            unicode: self.config.unicode,
            flipped: self.config.vs_ai && self.config.human_color == Color::Black,
            ..RenderOptions::default()
        }
    }

    fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "Terminal Chess v{}", env!("CARGO_PKG_VERSION"))?;
        match self.ai_color() {
            Some(ai) => writeln!(
                self.out,
                "You play {} against the computer ({}, plays {}).",
                self.config.human_color.name(),
                self.config.difficulty,
                ai.name()
            )?,
            None => writeln!(self.out, "Two players, White moves first.")?,
        }
        writeln!(
            self.out,
            "White: {} / Black: {}",
            self.game.white_player, self.game.black_player
        )?;
        writeln!(
            self.out,
            "Started {}",
            self.game.created_at.format("%Y-%m-%d %H:%M UTC")
        )?;
        writeln!(self.out, "Type 'help' for commands.")
    }

    fn show_board(&mut self) -> io::Result<()> {
        let opts = self.render_options();
        write!(self.out, "{}", render::render_board(self.game.position(), &opts))?;
        for color in [Color::White, Color::Black] {
            let captured = self.game.captured_by(color);
            if !captured.is_empty() {
                writeln!(
                    self.out,
                    "Captured by {}: {}",
                    color.name(),
                    render::render_captured(&captured, color, self.config.unicode)
                )?;
            }
        }
        if self.game.is_check() && !self.game.is_game_over() {
            writeln!(self.out, "{} is in check!", self.game.side_to_move().name())?;
        }
        Ok(())
    }

    /// Print a rejected request and carry on. Non-recoverable errors end
    /// the session.
    fn report(&mut self, result: Result<(), ChessError>) -> io::Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_recoverable() => {
                debug!(%err, "request rejected");
                writeln!(self.out, "Error: {err}")
            }
            Err(err) => {
                warn!(%err, "unrecoverable error");
                Err(io::Error::other(err))
            }
        }
    }

    /// Write `text`, read one line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.out, "{text}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        Ok(Some(line))
    }
}
