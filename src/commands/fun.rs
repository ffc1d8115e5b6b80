use rand::seq::SliceRandom;
use rand::Rng;

use super::CommandContext;
use crate::error::AppError;

const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "Why did the scarecrow win an award? He was outstanding in his field!",
    "Why don't eggs tell jokes? They'd crack each other up!",
    "Why don't skeletons fight each other? They don't have the guts!",
    "What do you call a fake noodle? An impasta!",
];

const FACTS: &[&str] = &[
    "Honey never spoils. Sealed honey from ancient tombs is still edible.",
    "Octopuses have three hearts and blue blood.",
    "A day on Venus is longer than a year on Venus.",
    "Bananas are berries, but strawberries are not.",
    "The Eiffel Tower grows about 15 cm taller in summer.",
];

const EIGHTBALL: &[&str] = &[
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes, definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

fn pick(list: &[&str]) -> String {
    list.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}

pub(super) async fn joke(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let joke = pick(JOKES);
    ctx.reply(&format!("Here's a joke:\n\n{joke}")).await
}

pub(super) async fn fact(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let fact = pick(FACTS);
    ctx.reply(&format!("*Random Fact*\n\n{fact}")).await
}

pub(super) async fn eightball(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    if args.is_empty() {
        return ctx.reply("Please ask a question.").await;
    }
    let answer = pick(EIGHTBALL);
    ctx.reply(&format!(
        "*Magic 8-Ball*\n\nQuestion: {}\n\nAnswer: {answer}",
        args.join(" ")
    ))
    .await
}

pub(super) async fn flip(ctx: &CommandContext<'_>, _args: &[String]) -> Result<(), AppError> {
    let result = if rand::thread_rng().gen_bool(0.5) {
        "Heads"
    } else {
        "Tails"
    };
    ctx.reply(&format!("Coin flip result: {result}")).await
}

pub(super) async fn roll(ctx: &CommandContext<'_>, args: &[String]) -> Result<(), AppError> {
    let sides: u32 = match args.first() {
        None => 6,
        Some(raw) => match raw.parse() {
            Ok(n) if n >= 2 => n,
            _ => return ctx.reply("Please provide a valid number of sides.").await,
        },
    };
    let result = rand::thread_rng().gen_range(1..=sides);
    ctx.reply(&format!("Dice roll result ({sides}-sided): {result}"))
        .await
}
