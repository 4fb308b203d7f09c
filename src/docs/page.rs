//! Interactive documentation page served at `/__api/docs`.

/// Self-contained page that renders `/__api/spec.json` and can call endpoints.
pub const DOCS_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>API</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
  body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #1d2330; }
  header { padding: 1.25rem 2rem; background: #1d2330; color: #fff; }
  header h1 { margin: 0; font-size: 1.3rem; }
  header p { margin: .3rem 0 0; opacity: .75; }
  main { max-width: 960px; margin: 0 auto; padding: 1.5rem; }
  .card { background: #fff; border: 1px solid #dde1e7; border-radius: 6px; margin-bottom: 1rem; padding: 1rem 1.25rem; }
  .card h2 { margin: 0; font-size: 1rem; font-family: ui-monospace, monospace; }
  .method { display: inline-block; background: #2a7a4b; color: #fff; border-radius: 3px; padding: 0 .4rem; margin-right: .5rem; font-size: .8rem; }
  .meta { color: #667085; font-size: .8rem; margin-top: .25rem; }
  table { border-collapse: collapse; margin-top: .5rem; }
  td { padding: .15rem .75rem .15rem 0; vertical-align: top; }
  textarea { width: 100%; min-height: 5rem; font-family: ui-monospace, monospace; box-sizing: border-box; }
  pre { background: #f0f2f5; padding: .5rem; overflow: auto; white-space: pre-wrap; }
  button { margin-top: .4rem; }
</style>
</head>
<body>
<header><h1 id="title">API</h1><p id="description"></p></header>
<main id="endpoints"><p>Loading…</p></main>
<script>
function el(tag, attrs, text) {
  const node = document.createElement(tag);
  Object.entries(attrs || {}).forEach(([k, v]) => node.setAttribute(k, v));
  if (text !== undefined) node.textContent = text;
  return node;
}

function card(path, op) {
  const box = el("section", { class: "card" });
  const title = el("h2");
  title.append(el("span", { class: "method" }, "POST"), path);
  box.append(title);
  box.append(el("div", { class: "meta" }, op["x-source"] + " · " + op["x-kind"]));
  if (op.summary) box.append(el("p", {}, op.summary));
  if (op.description) box.append(el("p", {}, op.description));
  if (op.parameters && op.parameters.length) {
    const table = el("table");
    op.parameters.forEach(p => {
      const row = el("tr");
      row.append(el("td", {}, p.name), el("td", {}, p.type), el("td", {}, p.description));
      table.append(row);
    });
    box.append(table);
  }
  const input = el("textarea", { placeholder: "JSON body" }, "{}");
  const send = el("button", {}, "Send");
  const output = el("pre");
  send.onclick = async () => {
    output.textContent = "…";
    try {
      const res = await fetch(path, {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: input.value,
      });
      const text = await res.text();
      let shown = text;
      try { shown = JSON.stringify(JSON.parse(text), null, 2); } catch (_) {}
      output.textContent = res.status + "\n" + shown;
    } catch (err) {
      output.textContent = String(err);
    }
  };
  box.append(input, send, output);
  return box;
}

fetch("/__api/spec.json")
  .then(res => res.json())
  .then(doc => {
    document.getElementById("title").textContent = doc.info.title + " " + doc.info.version;
    document.title = doc.info.title;
    document.getElementById("description").textContent = doc.info.description || "";
    const main = document.getElementById("endpoints");
    main.textContent = "";
    const paths = Object.keys(doc.paths).sort();
    if (!paths.length) main.append(el("p", {}, "No endpoints found."));
    paths.forEach(path => main.append(card(path, doc.paths[path].post)));
  })
  .catch(err => {
    document.getElementById("endpoints").textContent = "Failed to load spec: " + err;
  });
</script>
</body>
</html>
"#;
