//! Session loop integration tests
//!
//! Drive a full session with a scripted recognizer; no audio hardware or
//! network endpoint is touched (auto-answer stays off).

use parlance::recognizer::{RecognizerError, RecognizerEvent};
use parlance::session::{ChatSession, SessionEvent};
use tokio_test::assert_ok;

mod common;

use common::{ScriptedRecognizer, next_event, test_config, transcript};

#[tokio::test]
async fn test_interim_preview_then_debounced_commit() {
    let (recognizer, script) = ScriptedRecognizer::new();
    let (session, _handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    script.send(transcript("what is", false, 0)).await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::InterimPreview("what is".to_string())
    );

    script
        .send(transcript("what is the answer", true, 0))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("what is the answer".to_string())
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::QuestionDetected("what is the answer".to_string())
    );

    // Closing the script ends the session in non-continuous mode
    drop(script);
    assert_ok!(run.await.unwrap());
}

#[tokio::test]
async fn test_rapid_finals_coalesce_into_one_chunk() {
    let (recognizer, script) = ScriptedRecognizer::new();
    let (session, _handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    // Second final lands inside the silence window and supersedes the first
    script.send(transcript("how do", true, 0)).await.unwrap();
    script
        .send(transcript("how do I exit vim", true, 0))
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("how do I exit vim".to_string())
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::QuestionDetected("how do I exit vim".to_string())
    );

    drop(script);
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_duplicate_final_emits_nothing() {
    let (recognizer, script) = ScriptedRecognizer::new();
    let (session, _handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    script
        .send(transcript("nice weather today", true, 0))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("nice weather today".to_string())
    );

    // Re-fired final with the same normalized text is suppressed; the next
    // distinct chunk comes straight through
    script
        .send(transcript("  Nice   WEATHER today ", true, 0))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    script
        .send(transcript("something else entirely", true, 0))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("something else entirely".to_string())
    );

    drop(script);
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_short_statement_is_not_a_question() {
    let (recognizer, script) = ScriptedRecognizer::new();
    let (session, _handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    script.send(transcript("hello world", true, 0)).await.unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("hello world".to_string())
    );

    drop(script);
    assert!(run.await.unwrap().is_ok());
    // No QuestionDetected was queued behind the chunk
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_manual_ask_answers_pending_and_reports_failure() {
    let (recognizer, script) = ScriptedRecognizer::new();
    // Endpoint is unreachable, so the reply surfaces as a synthetic notice
    let (session, handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    script
        .send(transcript("what is the meaning of life", true, 0))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("what is the meaning of life".to_string())
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::QuestionDetected("what is the meaning of life".to_string())
    );

    handle.ask().await;
    assert_eq!(next_event(&mut events).await, SessionEvent::ReplyStarted);
    assert!(matches!(next_event(&mut events).await, SessionEvent::Notice(_)));
    assert_eq!(next_event(&mut events).await, SessionEvent::ReplyFinished);
    assert!(!handle.is_busy());

    drop(script);
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_stop_command_ends_the_loop() {
    let (recognizer, _script) = ScriptedRecognizer::new();
    let (session, handle, _events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    handle.stop().await;
    assert!(run.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_fatal_recognizer_error_surfaces_and_ends() {
    let (recognizer, script) = ScriptedRecognizer::new();
    let (session, _handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    script
        .send(RecognizerEvent::Error(RecognizerError::NotAllowed))
        .await
        .unwrap();

    assert!(matches!(next_event(&mut events).await, SessionEvent::Notice(_)));
    assert!(run.await.unwrap().is_err());
}

#[tokio::test]
async fn test_transient_recognizer_error_keeps_listening() {
    let (recognizer, script) = ScriptedRecognizer::new();
    let (session, _handle, mut events) =
        ChatSession::new(test_config(), Box::new(recognizer)).unwrap();
    let run = tokio::spawn(session.run());

    script
        .send(RecognizerEvent::Error(RecognizerError::NoSpeech))
        .await
        .unwrap();
    script.send(transcript("still here", true, 0)).await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::FinalChunk("still here".to_string())
    );

    drop(script);
    assert!(run.await.unwrap().is_ok());
}
