use axum::{response::Html, routing::get, Router};

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="ru">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Альтернативная История России</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; color: #1d1d1f; display: flex; min-height: 100vh; }
    aside { width: 220px; background: #f3f4f6; padding: 1.5rem 1rem; }
    main { flex: 1; padding: 1.5rem 2rem; max-width: 900px; }
    h1 { margin-top: 0; }
    .msg { border: 1px solid #ddd; padding: 0.75rem 1rem; border-radius: 8px; margin-bottom: 1rem; white-space: pre-wrap; }
    .user { background: #eef5ff; }
    .assistant { background: #fff; }
    .role { font-weight: 600; font-size: 0.85rem; color: #555; margin-bottom: 0.25rem; }
    .chart img { max-width: 100%; margin-top: 0.75rem; }
    .chart-error { background: #fdecea; color: #8a1c1c; padding: 0.75rem; margin-top: 0.75rem; border-radius: 6px; font-family: monospace; }
    details { margin-top: 0.5rem; font-size: 0.9rem; }
    pre { background: #f6f8fa; padding: 0.75rem; overflow: auto; white-space: pre-wrap; }
    form { display: flex; gap: 0.5rem; margin-top: 1rem; }
    textarea { flex: 1; padding: 0.5rem; min-height: 3rem; }
    button { padding: 0.6rem 1rem; }
    #status { color: #666; margin-top: 0.5rem; min-height: 1.2rem; }
  </style>
</head>
<body>
  <aside>
    <button id="newChat">Новый чат</button>
    <p style="font-size:0.85rem;color:#555">Задавайте вопросы «что было бы, если…» об истории России. В ответах указаны источники.</p>
  </aside>
  <main>
    <h1>Альтернативная История России</h1>
    <div id="messages"></div>
    <form id="chatForm">
      <textarea id="input" placeholder="Задайте вопрос об альтернативной истории"></textarea>
      <button type="submit" id="send">Отправить</button>
    </form>
    <div id="status"></div>
  </main>

  <script>
    const messagesEl = document.getElementById('messages');
    const statusEl = document.getElementById('status');
    const input = document.getElementById('input');
    const send = document.getElementById('send');

    function el(tag, cls, text) {
      const node = document.createElement(tag);
      if (cls) node.className = cls;
      if (text !== undefined) node.textContent = text;
      return node;
    }

    function renderMessage(m) {
      const box = el('div', 'msg ' + m.role);
      box.appendChild(el('div', 'role', m.role === 'user' ? 'Вы' : 'Ассистент'));
      box.appendChild(el('div', '', m.content));

      if (m.subquestions && m.subquestions.length) {
        const d = el('details');
        d.appendChild(el('summary', '', 'Вспомогательные вопросы'));
        d.appendChild(el('pre', '', m.subquestions.join('\n')));
        box.appendChild(d);
      }
      if (m.sources && m.sources.length) {
        const d = el('details');
        d.appendChild(el('summary', '', 'Источники'));
        for (const s of m.sources) {
          d.appendChild(el('div', 'role', 'Вопрос: ' + s.question));
          d.appendChild(el('pre', '', s.result));
        }
        box.appendChild(d);
      }
      if (m.chart_png) {
        const c = el('div', 'chart');
        const img = el('img');
        img.src = 'data:image/png;base64,' + m.chart_png;
        c.appendChild(img);
        box.appendChild(c);
      }
      if (m.chart_error) {
        box.appendChild(el('div', 'chart-error', m.chart_error));
      }
      return box;
    }

    async function refresh() {
      const res = await fetch('/api/messages');
      const list = await res.json();
      messagesEl.innerHTML = '';
      for (const m of list) messagesEl.appendChild(renderMessage(m));
    }

    document.getElementById('chatForm').addEventListener('submit', async (e) => {
      e.preventDefault();
      const message = input.value.trim();
      if (!message) return;
      send.disabled = true;
      statusEl.textContent = 'Анализирую исторические данные...';
      try {
        const res = await fetch('/api/chat', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ message })
        });
        if (!res.ok) {
          const err = await res.json().catch(() => ({}));
          statusEl.textContent = err.error || ('Ошибка запроса: ' + res.status);
        } else {
          statusEl.textContent = '';
          input.value = '';
        }
      } catch (err) {
        statusEl.textContent = String(err);
      } finally {
        send.disabled = false;
        await refresh();
      }
    });

    document.getElementById('newChat').addEventListener('click', async () => {
      await fetch('/api/session/clear', { method: 'POST' });
      statusEl.textContent = '';
      await refresh();
    });

    refresh();
  </script>
</body>
</html>
"#;
