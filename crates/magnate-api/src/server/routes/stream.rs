async fn stream_account(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, HttpApiError> {
    {
        let api = state.api.lock().await;
        api.account(&account_id).map_err(HttpApiError::from_game)?;
    }

    Ok(ws.on_upgrade(move |socket| stream_socket(socket, state, account_id)))
}

async fn stream_socket(mut socket: WebSocket, state: AppState, account_id: String) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.registry.register(&account_id, tx.clone());

    if send_push(&mut socket, &PushMessage::connected(&account_id))
        .await
        .is_err()
    {
        state.registry.unregister(&account_id, &tx);
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if send_push(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    state.registry.unregister(&account_id, &tx);
}

async fn send_push(socket: &mut WebSocket, message: &PushMessage) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}
