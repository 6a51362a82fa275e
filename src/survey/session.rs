use crate::survey::*;

use std::io::{BufRead, Write};
use std::time::Instant;

use group_balance::Assignment;

use crate::survey::config_reader::Study;
use crate::survey::results::{timestamp_now, CsvResultsWriter, ResponseRecord};

pub const PRICE_FAIRNESS_QUESTION: &str =
    "1. How fair does the displayed price of this product seem to you?";
pub const PRICE_FAIRNESS_ANCHORS: [&str; 7] = [
    "1 - Completely unfair",
    "2 - Very unfair",
    "3 - Somewhat unfair",
    "4 - Neither fair nor unfair",
    "5 - Somewhat fair",
    "6 - Very fair",
    "7 - Absolutely fair",
];

pub const MAX_PRICE_QUESTION: &str =
    "2. What is the maximum amount you would be willing to pay for this product?";

pub const PURCHASE_PROBABILITY_QUESTION: &str =
    "3. How likely is it that you would buy this product at the displayed price?";
pub const PURCHASE_PROBABILITY_ANCHORS: [&str; 7] = [
    "1 - Definitely not",
    "2 - Extremely unlikely",
    "3 - Unlikely",
    "4 - Hard to say",
    "5 - Likely",
    "6 - Very likely",
    "7 - Definitely yes",
];

/// Parses an answer on the 7-point scale.
pub fn parse_scale_answer(input: &str) -> Option<u8> {
    match input.trim().parse::<u8>() {
        Result::Ok(v) if (1..=7).contains(&v) => Some(v),
        _ => None,
    }
}

/// Parses the free-numeric willingness-to-pay answer. Comma decimal
/// separators are accepted, negative and non-finite values are not.
pub fn parse_price_answer(input: &str) -> Option<f64> {
    match input.trim().replace(',', ".").parse::<f64>() {
        Result::Ok(v) if v >= 0.0 && v.is_finite() => Some(v),
        _ => None,
    }
}

fn read_line(input: &mut impl BufRead) -> SurveyResult<String> {
    let mut buf = String::new();
    let n = input.read_line(&mut buf).context(ReadingInputSnafu {})?;
    if n == 0 {
        whatever!("Unexpected end of input: the session was aborted");
    }
    Ok(buf.trim().to_string())
}

/// Prompts until a non-empty participant number is entered.
pub fn prompt_participant_number(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> SurveyResult<String> {
    loop {
        write!(output, "Please enter your participant number: ").context(PromptingSnafu {})?;
        output.flush().context(PromptingSnafu {})?;
        let line = read_line(input)?;
        if !line.is_empty() {
            return Ok(line);
        }
        writeln!(output, "A participant number is required.").context(PromptingSnafu {})?;
    }
}

fn ask_scale(
    input: &mut impl BufRead,
    output: &mut impl Write,
    question: &str,
    anchors: &[&str],
) -> SurveyResult<u8> {
    writeln!(output, "\n{}", question).context(PromptingSnafu {})?;
    for anchor in anchors {
        writeln!(output, "  {}", anchor).context(PromptingSnafu {})?;
    }
    loop {
        write!(output, "Your answer (1-7): ").context(PromptingSnafu {})?;
        output.flush().context(PromptingSnafu {})?;
        let line = read_line(input)?;
        match parse_scale_answer(&line) {
            Some(v) => return Ok(v),
            None => {
                writeln!(output, "Please answer with a number from 1 to 7.")
                    .context(PromptingSnafu {})?;
            }
        }
    }
}

fn ask_price(
    input: &mut impl BufRead,
    output: &mut impl Write,
    question: &str,
) -> SurveyResult<f64> {
    writeln!(output, "\n{}", question).context(PromptingSnafu {})?;
    loop {
        write!(output, "Amount: ").context(PromptingSnafu {})?;
        output.flush().context(PromptingSnafu {})?;
        let line = read_line(input)?;
        match parse_price_answer(&line) {
            Some(v) => return Ok(v),
            None => {
                writeln!(output, "Please enter a non-negative number.")
                    .context(PromptingSnafu {})?;
            }
        }
    }
}

fn show_instruction(output: &mut impl Write, study_name: &str) -> SurveyResult<()> {
    writeln!(
        output,
        "\n=== {} ===\n\n\
        Thank you for taking part in this study. You will be shown a series of\n\
        products, as if you were browsing an online store. For each product:\n\n\
        1. look at the product and its price;\n\
        2. press ENTER as soon as you have formed an impression;\n\
        3. answer three short questions about the product.\n\n\
        Please answer quickly and intuitively, as you would when shopping online.",
        study_name
    )
    .context(PromptingSnafu {})
}

/// Runs the per-product survey loop and appends one record per product.
pub fn run_session(
    study: &Study,
    assignment: &Assignment,
    participant: &str,
    files: &[String],
    writer: &mut CsvResultsWriter,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> SurveyResult<()> {
    show_instruction(output, &study.name)?;
    write!(output, "\nPress ENTER to begin. ").context(PromptingSnafu {})?;
    output.flush().context(PromptingSnafu {})?;
    read_line(input)?;

    let total = files.len();
    for (idx, image_file) in files.iter().enumerate() {
        let product_number = idx + 1;
        writeln!(
            output,
            "\n--- Product {} of {} ---\nImage: {}/{}/{}\nPress ENTER when you have looked at the product.",
            product_number, total, study.photos_dir, assignment.group_key, image_file
        )
        .context(PromptingSnafu {})?;
        output.flush().context(PromptingSnafu {})?;

        let shown_at = Instant::now();
        read_line(input)?;
        let reaction_time = shown_at.elapsed().as_secs_f64();

        let price_fairness =
            ask_scale(input, output, PRICE_FAIRNESS_QUESTION, &PRICE_FAIRNESS_ANCHORS)?;
        let max_price = ask_price(input, output, MAX_PRICE_QUESTION)?;
        let purchase_probability = ask_scale(
            input,
            output,
            PURCHASE_PROBABILITY_QUESTION,
            &PURCHASE_PROBABILITY_ANCHORS,
        )?;

        let record = ResponseRecord {
            participant_number: participant.to_string(),
            group: assignment.label.clone(),
            group_key: assignment.group_key.clone(),
            product_number,
            total_products: total,
            image_file: image_file.clone(),
            reaction_time: (reaction_time * 1000.0).round() / 1000.0,
            price_fairness,
            max_price,
            purchase_probability,
            timestamp: timestamp_now(),
        };
        writer.append(&record)?;
        info!(
            "recorded product {}/{} for participant {}",
            product_number, total, participant
        );
    }

    writeln!(
        output,
        "\n=== The survey is complete. Thank you for your participation! ==="
    )
    .context(PromptingSnafu {})?;
    Ok(())
}
