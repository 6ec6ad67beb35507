use std::{
    fs, io,
    path::{Path, PathBuf},
};

use ansi_term::{ANSIGenericString, Colour, Style};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};

use mineverse_lib::{
    board::{Board, BoardPoint},
    cell::Cell,
    difficulty::Difficulty,
    game::{Action, Game, PlayOutcome},
    replay::MinesweeperReplay,
    store::{GameRecord, GameStore, MemoryStore},
};

const GAME_ID: &str = "local";

fn underline(input: &str) -> ANSIGenericString<str> {
    Style::new().underline().paint(input)
}

fn paint_cell(cell: &Cell, highlight: bool) -> String {
    let text = format!("{}", cell);
    let style = match (cell.is_revealed, cell.is_mine, cell.is_flagged) {
        (true, true, _) if cell.exploded => Colour::White.on(Colour::Red).bold(),
        (true, true, _) => Colour::Red.bold(),
        (true, false, _) => match cell.adjacent_mines {
            1 => Colour::Blue.normal(),
            2 => Colour::Green.normal(),
            3 => Colour::Red.normal(),
            4 => Colour::Purple.normal(),
            _ => Colour::Yellow.normal(),
        },
        (false, _, true) => Colour::Yellow.bold(),
        (false, _, false) => Style::new().dimmed(),
    };
    let style = if highlight { style.reverse() } else { style };
    style.underline().paint(text).to_string()
}

fn print_board(board: &Board<Cell>, highlight: Option<BoardPoint>) {
    let header = (0..board.cols()).fold(String::new(), |acc, x| acc + &format!("|{}", x / 10));
    println!("XX{}|", header);
    let header = (0..board.cols()).fold(String::new(), |acc, x| acc + &format!("|{}", x % 10));
    println!("{}", underline(&format!("XX{}|", header)));
    for (r_num, row) in board.rows_iter().enumerate() {
        print!("{}", underline(&format!("{:0>2}", r_num)));
        for cell in row {
            print!(
                "{}{}",
                underline("|"),
                paint_cell(cell, highlight == Some(cell.point()))
            );
        }
        print!("{}", underline("|\n"));
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read line")?;
    Ok(line.trim().to_string())
}

fn parse_play(line: &str) -> Result<(Action, BoardPoint)> {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    let [action, row, col] = parts.as_slice() else {
        bail!("Bad number of inputs")
    };
    let action = match *action {
        "r" => Action::Reveal,
        "f" => Action::Flag,
        _ => bail!("Bad action {action:?}"),
    };
    let row = row.parse().with_context(|| format!("Invalid row {row:?}"))?;
    let col = col.parse().with_context(|| format!("Invalid col {col:?}"))?;
    Ok((action, BoardPoint { row, col }))
}

fn play(difficulty: Difficulty, seed: Option<u64>, save: Option<&Path>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let store = MemoryStore::new();
    store.create_game(GAME_ID, difficulty.setting())?;
    let mut game = Game::new(difficulty.setting());

    println!("{difficulty} game. Input `{{r|f}} {{row}} {{col}}` to play, `q` to quit.");
    while !game.is_over() {
        print_board(game.board(), None);
        println!(
            "Mines left: {}  Time: {}s",
            game.mines_left(),
            game.elapsed_seconds(Utc::now())
        );

        let line = read_line()?;
        if line == "q" {
            store.quit_game(GAME_ID, Utc::now())?;
            println!("Quit");
            break;
        }
        let (action, point) = match parse_play(&line) {
            Ok(play) => play,
            Err(e) => {
                println!("{e} - try again.");
                continue;
            }
        };

        match game.play(action, point, Utc::now(), &mut rng) {
            Ok(PlayOutcome::Success(n)) => println!("Revealed {n}"),
            Ok(PlayOutcome::Failure(_)) => println!("You Died"),
            Ok(PlayOutcome::Victory(_)) => println!("You won!!!"),
            Ok(PlayOutcome::Flag((_, flagged))) => {
                println!("{}", if flagged { "Flagged" } else { "Unflagged" })
            }
            Err(e) => {
                println!("Invalid action - try again: {e}");
                continue;
            }
        }
        store.save_game(GAME_ID, &game)?;
    }

    if game.is_over() {
        print_board(game.board(), None);
        println!("Finished in {}s", game.elapsed_seconds(Utc::now()));
    }

    if let Some(path) = save {
        let record = store.get_game(GAME_ID)?;
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(path, json).with_context(|| format!("Unable to write {}", path.display()))?;
        println!("Saved game record to {}", path.display());
    }
    Ok(())
}

fn review(path: &Path) -> Result<()> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Unable to read {}", path.display()))?;
    let record: GameRecord = serde_json::from_str(&raw).context("Invalid game record")?;
    let mut replay: MinesweeperReplay = record.review();
    if let Some(warning) = replay.warning() {
        println!("Warning: {warning}");
    }

    println!("Input `n` next, `p` previous, a move number to jump, `q` to quit.");
    loop {
        let frame = replay.current_frame();
        print_board(&frame.board, frame.highlight);
        println!(
            "Move {}/{}  Time: {}s{}",
            replay.current_pos(),
            replay.len() - 1,
            frame.elapsed_seconds,
            if frame.hit_mine { "  Mine hit" } else { "" }
        );

        let line = read_line()?;
        let res = match line.as_str() {
            "q" => break,
            "n" => replay.advance(),
            "p" => replay.rewind(),
            pos => match pos.parse() {
                Ok(pos) => replay.to_pos(pos),
                Err(_) => {
                    println!("Bad input - try again");
                    continue;
                }
            },
        };
        if let Err(e) = res {
            println!("{e}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let flags = xflags::parse_or_exit! {
        optional -i,--intermediate
        optional -e,--expert
        optional -v,--verbose
        optional --seed seed: u64
        optional --save path: PathBuf
        optional --review path: PathBuf
    };

    let log_level = if flags.verbose {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(log_level)?;

    if let Some(path) = flags.review {
        return review(&path);
    }

    let difficulty = if flags.expert {
        Difficulty::Hard
    } else if flags.intermediate {
        Difficulty::Medium
    } else {
        Difficulty::Easy
    };
    play(difficulty, flags.seed, flags.save.as_deref())
}
