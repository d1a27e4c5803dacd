use std::{
    fmt::Display,
    io::{self, BufRead, Write},
    str::FromStr,
};

use shared::error::UnknownChoice;

/// Accepts a 1-based option number or the option's label.
pub fn parse_choice<T>(raw: &str, options: &[T]) -> Result<T, UnknownChoice>
where
    T: Copy + FromStr<Err = UnknownChoice>,
{
    if let Ok(number) = raw.trim().parse::<usize>() {
        if let Some(choice) = number.checked_sub(1).and_then(|i| options.get(i)) {
            return Ok(*choice);
        }
    }
    raw.parse()
}

/// Line-oriented terminal prompts. An empty answer or end of input means the
/// user walked away.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(answer.to_string()))
        }
    }

    pub fn choose<T>(&mut self, question: &str, options: &[T]) -> io::Result<Option<T>>
    where
        T: Copy + Display + FromStr<Err = UnknownChoice>,
    {
        writeln!(self.output, "{question}")?;
        for (index, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}. {option}", index + 1)?;
        }

        loop {
            let Some(answer) = self.ask(">")? else {
                return Ok(None);
            };
            match parse_choice(&answer, options) {
                Ok(choice) => return Ok(Some(choice)),
                Err(error) => writeln!(self.output, "{error}; pick 1-{}", options.len())?,
            }
        }
    }
}
