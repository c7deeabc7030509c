mod config;
mod messages;
mod quiz;

use std::sync::Arc;

use config::Config;
use dotenv::dotenv;
use log::{error, info, warn};
use quiz::{
    ai_helper::{ChatGptProvider, CompletionProvider},
    judge::AnswerJudge,
    session::QuizSession,
    source::QuestionSource,
    Letter, QuizError,
};
use teloxide::{
    dispatching::{
        dialogue::{ErasedStorage, InMemStorage, Storage},
        UpdateHandler,
    },
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup, KeyboardRemove, ParseMode},
    utils::command::BotCommands,
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type QuizStorage = Arc<ErasedStorage<State>>;
type HandlerError = Box<dyn std::error::Error + Send + Sync>;
type HandlerResult = Result<(), HandlerError>;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveTopic {
        session: QuizSession,
    },
    Answering {
        session: QuizSession,
    },
    ReadyToEvaluate {
        session: QuizSession,
    },
    Evaluated {
        session: QuizSession,
    },
}

impl State {
    fn into_session(self) -> QuizSession {
        match self {
            State::Start => QuizSession::new(),
            State::ReceiveTopic { session }
            | State::Answering { session }
            | State::ReadyToEvaluate { session }
            | State::Evaluated { session } => session,
        }
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum Command {
    #[command(description = "show this text.")]
    Help,
    #[command(description = "drop the current quiz and pick a new topic.")]
    NewQuiz,
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine, the variables may come from the environment itself
    dotenv().ok();
    pretty_env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let provider: Arc<dyn CompletionProvider> =
        match ChatGptProvider::new(&config.openai_api_key, config.request_timeout) {
            Ok(provider) => Arc::new(provider),
            Err(err) => {
                error!("Unable to set up the ChatGPT client: {}", err);
                std::process::exit(1);
            }
        };

    let source = Arc::new(QuestionSource::new(
        provider.clone(),
        config.request_timeout,
        config.question_count,
    ));
    let judge = Arc::new(AnswerJudge::new(provider, config.request_timeout));
    let storage: QuizStorage = InMemStorage::<State>::new().erase();

    info!(
        "Starting quiz bot ({} questions per quiz, {:?} provider timeout)...",
        config.question_count, config.request_timeout
    );
    let bot = Bot::new(config.telegram_token);

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![storage, source, judge])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<HandlerError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::NewQuiz].endpoint(new_quiz));

    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(command_handler)
        .branch(case![State::Start].endpoint(start))
        .branch(case![State::ReceiveTopic { session }].endpoint(receive_topic))
        .branch(case![State::Answering { session }].endpoint(receive_answer))
        .branch(case![State::ReadyToEvaluate { session }].endpoint(evaluate_answers))
        .branch(case![State::Evaluated { session }].endpoint(after_results))
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn new_quiz(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    let mut session = dialogue.get().await?.unwrap_or_default().into_session();
    session.reset();
    info!("Chat {} asked for a new quiz", msg.chat.id);

    dialogue.update(State::ReceiveTopic { session }).await?;
    bot.send_message(msg.chat.id, messages::ASK_TOPIC_TEXT)
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    dialogue
        .update(State::ReceiveTopic {
            session: QuizSession::new(),
        })
        .await?;

    bot.send_message(msg.chat.id, messages::GREETING_TEXT)
        .reply_markup(KeyboardRemove::new())
        .await?;
    Ok(())
}

async fn receive_topic(
    source: Arc<QuestionSource>,
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    begin_quiz(&source, &bot, &dialogue, session, msg.chat.id, msg.text()).await
}

async fn receive_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    let Some(letter) = msg.text().and_then(Letter::parse_labeled) else {
        bot.send_message(msg.chat.id, messages::PICK_OPTION_TEXT)
            .reply_markup(options_keyboard())
            .await?;
        return Ok(());
    };

    if let Err(err) = session.submit_answer(letter.as_str()) {
        warn!("Chat {} answered out of turn: {}", msg.chat.id, err);
        return Ok(());
    }

    if session.is_complete() {
        dialogue.update(State::ReadyToEvaluate { session }).await?;
        bot.send_message(msg.chat.id, messages::COMPLETED_TEXT)
            .reply_markup(single_button_keyboard(messages::SEE_RESULTS_BUTTON))
            .await?;
    } else {
        dialogue
            .update(State::Answering {
                session: session.clone(),
            })
            .await?;
        send_current_question(&bot, msg.chat.id, &session).await?;
    }
    Ok(())
}

async fn evaluate_answers(
    judge: Arc<AnswerJudge>,
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    finish_quiz(&judge, &bot, &dialogue, session, msg.chat.id).await
}

async fn after_results(
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    handle_results_choice(&bot, &dialogue, session, msg.chat.id, msg.text()).await
}

/// The topic carried by a message, if it can be one. Commands never are.
fn topic_from_text(text: Option<&str>) -> Option<&str> {
    text.map(str::trim)
        .filter(|topic| !topic.is_empty() && !topic.starts_with('/'))
}

// The dialogue is stored before anything is sent, so a failed send never loses
// fetched questions or finished evaluations.
async fn begin_quiz(
    source: &QuestionSource,
    bot: &Bot,
    dialogue: &QuizDialogue,
    mut session: QuizSession,
    chat_id: ChatId,
    text: Option<&str>,
) -> HandlerResult {
    let Some(topic) = topic_from_text(text) else {
        let reply = match text {
            Some(text) if text.trim_start().starts_with('/') => messages::NOT_A_TOPIC_TEXT,
            _ => messages::EMPTY_TOPIC_TEXT,
        };
        bot.send_message(chat_id, reply).await?;
        return Ok(());
    };

    if let Err(err) = bot.send_message(chat_id, messages::CREATING_QUIZ_TEXT).await {
        warn!("Chat {} missed the progress notice: {}", chat_id, err);
    }
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    match session.start_quiz(source, topic).await {
        Ok(count) => {
            dialogue
                .update(State::Answering {
                    session: session.clone(),
                })
                .await?;
            bot.send_message(
                chat_id,
                format!("Your quiz is ready: {} questions. Good luck! 🍀", count),
            )
            .await?;
            send_current_question(bot, chat_id, &session).await?;
        }
        Err(QuizError::EmptyTopic) => {
            bot.send_message(chat_id, messages::EMPTY_TOPIC_TEXT)
                .await?;
        }
        Err(err) => {
            warn!("Could not create a quiz for chat {}: {}", chat_id, err);
            bot.send_message(chat_id, messages::QUIZ_FAILED_TEXT)
                .await?;
        }
    }
    Ok(())
}

async fn finish_quiz(
    judge: &AnswerJudge,
    bot: &Bot,
    dialogue: &QuizDialogue,
    mut session: QuizSession,
    chat_id: ChatId,
) -> HandlerResult {
    if let Err(err) = bot
        .send_message(chat_id, messages::EVALUATING_TEXT)
        .reply_markup(KeyboardRemove::new())
        .await
    {
        warn!("Chat {} missed the progress notice: {}", chat_id, err);
    }
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    if let Err(err) = session.run_evaluation(judge).await {
        error!("Chat {} reached evaluation too early: {}", chat_id, err);
        session.reset();
        dialogue.update(State::ReceiveTopic { session }).await?;
        bot.send_message(chat_id, messages::QUIZ_FAILED_TEXT)
            .await?;
        return Ok(());
    }

    dialogue
        .update(State::Evaluated {
            session: session.clone(),
        })
        .await?;
    send_results(bot, chat_id, &session).await
}

async fn handle_results_choice(
    bot: &Bot,
    dialogue: &QuizDialogue,
    mut session: QuizSession,
    chat_id: ChatId,
    text: Option<&str>,
) -> HandlerResult {
    match text {
        Some(messages::SHOW_AGAIN_BUTTON) => {
            send_results(bot, chat_id, &session).await?;
        }
        Some(messages::NEW_QUIZ_BUTTON) => {
            session.reset();
            dialogue.update(State::ReceiveTopic { session }).await?;
            bot.send_message(chat_id, messages::ASK_TOPIC_TEXT)
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
        _ => {
            bot.send_message(chat_id, "Please choose one of the options below.")
                .reply_markup(results_keyboard())
                .await?;
        }
    }
    Ok(())
}

async fn send_current_question(
    bot: &Bot,
    chat_id: ChatId,
    session: &QuizSession,
) -> HandlerResult {
    let Some(text) = messages::question_message(session) else {
        return Ok(());
    };

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(options_keyboard())
        .await?;
    Ok(())
}

async fn send_results(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    for (i, (question, answer)) in session.results().enumerate() {
        bot.send_message(chat_id, messages::result_message(i + 1, question, answer))
            .parse_mode(ParseMode::Html)
            .await?;
    }

    if let (Some(score), Some(correct)) = (session.score(), session.correct_count()) {
        bot.send_message(
            chat_id,
            messages::score_message(score, correct, session.total_questions()),
        )
        .parse_mode(ParseMode::Html)
        .reply_markup(results_keyboard())
        .await?;
    }
    Ok(())
}

fn options_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![Letter::ALL
        .iter()
        .map(|letter| KeyboardButton::new(letter.as_str()))
        .collect::<Vec<_>>()])
}

fn single_button_keyboard(text: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(text)]])
}

fn results_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(messages::SHOW_AGAIN_BUTTON),
        KeyboardButton::new(messages::NEW_QUIZ_BUTTON),
    ]])
}
